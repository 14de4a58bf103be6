// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

pub mod coerce;
pub mod dialog;
pub mod filter;
pub mod forms;
pub mod ids;
pub mod model;
pub mod route;
pub mod schema;
pub mod state;
pub mod store;

pub use coerce::*;
pub use dialog::*;
pub use filter::*;
pub use forms::*;
pub use ids::*;
pub use model::*;
pub use route::*;
pub use schema::*;
pub use state::*;
pub use store::*;
