use chrono::{DateTime, Local, NaiveDate};
use garde::Validate;
use serde::{Deserialize, Serialize};

/// Tire attributes printed on a label and carried alongside its print job.
///
/// Every attribute is optional; `None` means the product form left it blank.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, Validate)]
pub struct TireSpec {
    #[garde(length(max = 200))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub brand: Option<String>,

    #[garde(length(max = 200))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,

    /// Section width in millimetres, e.g. "225".
    #[garde(length(max = 10))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<String>,

    /// Aspect ratio, e.g. "45".
    #[garde(length(max = 10))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<String>,

    /// Rim diameter, e.g. "17" or "R17".
    #[garde(length(max = 10))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rim: Option<String>,

    #[garde(length(max = 10))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub load_index: Option<String>,

    #[garde(length(max = 10))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub speed_index: Option<String>,

    /// DOT week/year code, e.g. "3419".
    #[garde(length(max = 20))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dot: Option<String>,

    #[garde(length(max = 20))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tread_depth: Option<String>,

    #[garde(length(max = 500))]
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub product_url: Option<String>,
}

impl TireSpec {
    /// Set a named attribute from a form field. Blank values stay unset.
    /// Returns false for names that are not tire attributes.
    pub fn set_field(&mut self, name: &str, value: String) -> bool {
        let slot = match name {
            "brand" => &mut self.brand,
            "model" => &mut self.model,
            "width" => &mut self.width,
            "height" => &mut self.height,
            "rim" => &mut self.rim,
            "load_index" => &mut self.load_index,
            "speed_index" => &mut self.speed_index,
            "dot" => &mut self.dot,
            "tread_depth" => &mut self.tread_depth,
            "product_url" => &mut self.product_url,
            _ => return false,
        };
        let trimmed = value.trim();
        *slot = (!trimmed.is_empty()).then(|| trimmed.to_string());
        true
    }
}

/// Sidecar written next to each label saved by the print agent.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelSidecar {
    pub job_id: String,
    pub sku: String,
    #[serde(default)]
    pub metadata: TireSpec,
    pub saved_at: DateTime<Local>,
}

/// A label file in the agent's local labels tree.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LabelRecord {
    /// Path relative to the active or archive root, `YYYY-MM-DD/HHMMSS_SKU.pdf`.
    pub path: String,
    pub date: NaiveDate,
    pub sku: String,
    pub size_bytes: u64,
    pub archived: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sidecar: Option<LabelSidecar>,
}

/// Reduce an arbitrary business reference to something safe to use in file
/// names, URL paths and job IDs.
pub fn sanitize_component(raw: &str) -> String {
    let cleaned: String = raw
        .trim()
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || c == '-' || c == '_' {
                c
            } else {
                '_'
            }
        })
        .collect();

    if cleaned.is_empty() {
        "unknown".to_string()
    } else {
        cleaned
    }
}
