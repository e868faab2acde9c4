// Infrastructure layer - External dependencies and adapters
pub mod barchart_client;
pub mod config;
pub mod mysql_repository;
