// Domain layer - Fuel price models and aggregation rules
pub mod aggregation;
pub mod fuel;
pub mod geography;
pub mod report;
pub mod station;
