pub mod apple_spi;
