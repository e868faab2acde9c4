pub mod price_repository;
pub mod price_source;
pub mod pricing_service;
pub mod refresh_service;
pub mod snapshot_service;

#[cfg(test)]
pub mod testing;
