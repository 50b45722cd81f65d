//! Server-rendered shells for the dashboard. Each page pulls its data from
//! the JSON API and draws with Plotly in the browser.

use crate::server::router::LabState;
use axum::{Router, response::Html, routing::get};

const HOME_HTML: &str = include_str!("../../../assets/home.html");
const COST_HTML: &str = include_str!("../../../assets/cost.html");
const GROWTH_HTML: &str = include_str!("../../../assets/growth.html");

pub fn router() -> Router<LabState> {
    Router::new()
        .route("/", get(home))
        .route("/cost", get(cost))
        .route("/growth", get(growth))
}

async fn home() -> Html<&'static str> {
    Html(HOME_HTML)
}

async fn cost() -> Html<&'static str> {
    Html(COST_HTML)
}

async fn growth() -> Html<&'static str> {
    Html(GROWTH_HTML)
}
