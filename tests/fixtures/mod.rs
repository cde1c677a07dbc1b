//! Test fixtures for queue and agent tests

use tire_label_queue::models::label::TireSpec;

/// A 10-byte stand-in for a rendered label.
pub const FAKE_PDF: &[u8] = b"%PDF-1.4\n%";

/// Tire attributes as the product form would submit them.
pub fn sample_tire() -> TireSpec {
    TireSpec {
        brand: Some("Michelin".to_string()),
        model: Some("Pilot Sport 4".to_string()),
        width: Some("225".to_string()),
        height: Some("45".to_string()),
        rim: Some("17".to_string()),
        load_index: Some("94".to_string()),
        speed_index: Some("Y".to_string()),
        dot: Some("3419".to_string()),
        tread_depth: Some("7mm".to_string()),
        product_url: Some("https://smartpneu.com/products/test".to_string()),
    }
}
