pub mod api;
pub mod availability;
pub mod normalize;
pub mod record;
pub mod upsert;
pub mod validate;
