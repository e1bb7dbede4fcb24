use axum::extract::{Query, State};
use axum::Json;
use chrono::Utc;
use kikubo_auth::Action;
use kikubo_reports::{parse_limit, DashboardStats, DateRange, ProductSales, SalespersonSales};

use super::{param, Params};
use crate::auth::Auth;
use crate::error::ServerResult;
use crate::state::SharedState;

pub async fn dashboard(State(state): State<SharedState>, auth: Auth) -> ServerResult<Json<DashboardStats>> {
    auth.require(&state, Action::ViewReports).await?;
    let stats = state.reports.dashboard(auth.store()?, Utc::now().date_naive())?;
    Ok(Json(stats))
}

fn range(params: &Params) -> ServerResult<DateRange> {
    Ok(DateRange::from_query(
        param(params, "start_date"),
        param(params, "end_date"),
        Utc::now().date_naive(),
    )?)
}

pub async fn sales(
    State(state): State<SharedState>,
    auth: Auth,
    Query(params): Query<Params>,
) -> ServerResult<Json<Vec<SalespersonSales>>> {
    auth.require(&state, Action::ViewReports).await?;
    let rows = state.reports.sales(auth.store()?, range(&params)?)?;
    Ok(Json(rows))
}

pub async fn products(
    State(state): State<SharedState>,
    auth: Auth,
    Query(params): Query<Params>,
) -> ServerResult<Json<Vec<ProductSales>>> {
    auth.require(&state, Action::ViewReports).await?;
    let limit = parse_limit(param(&params, "limit"))?;
    let rows = state.reports.products(auth.store()?, range(&params)?, limit)?;
    Ok(Json(rows))
}
