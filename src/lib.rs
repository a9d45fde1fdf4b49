pub mod config;
pub mod export;
pub mod features;
pub mod goals_conceded;
pub mod loader;
pub mod names;
pub mod one_hot;
pub mod pipeline;
pub mod progress;
pub mod record;
pub mod reference;
pub mod season;
pub mod synthetic;
pub mod window;
