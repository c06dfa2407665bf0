use std::error::Error;

use crate::{config::TrackpadConfig, drivers::apple_spi::driver::TrackpadInfo};

#[tokio::test]
async fn test_load_full_config() -> Result<(), Box<dyn Error>> {
    let yaml = r#"
name: MacBookPro14,3 Trackpad
dimensions:
  x_min: -6243
  x_max: 6749
  y_min: -170
  y_max: 7685
ticks_per_unit: 1000
buffer_pool_size: 4
packet_buffer_size: 256
command_queue_size: 64
"#;
    let config = TrackpadConfig::from_yaml(yaml.to_string())?;
    assert_eq!(config.name, "MacBookPro14,3 Trackpad");
    assert_eq!(
        config.dimensions,
        TrackpadInfo {
            x_min: -6243,
            x_max: 6749,
            y_min: -170,
            y_max: 7685,
        }
    );
    assert_eq!(config.ticks_per_unit, 1000);
    assert_eq!(config.buffer_pool_size, 4);
    assert_eq!(config.packet_buffer_size, 256);
    assert_eq!(config.command_queue_size, 64);

    Ok(())
}

#[tokio::test]
async fn test_partial_config_uses_defaults() -> Result<(), Box<dyn Error>> {
    let yaml = "name: Test Pad\nbuffer_pool_size: 2\n";
    let config = TrackpadConfig::from_yaml(yaml.to_string())?;
    let defaults = TrackpadConfig::default();
    assert_eq!(config.name, "Test Pad");
    assert_eq!(config.buffer_pool_size, 2);
    assert_eq!(config.dimensions, defaults.dimensions);
    assert_eq!(config.ticks_per_unit, 100);

    Ok(())
}

#[tokio::test]
async fn test_invalid_config() -> Result<(), Box<dyn Error>> {
    let result = TrackpadConfig::from_yaml("ticks_per_unit: lots".to_string());
    assert!(result.is_err());

    let result = TrackpadConfig::from_yaml_file("/nonexistent/trackpad.yaml");
    assert!(result.is_err());

    Ok(())
}
