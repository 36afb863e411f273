use crate::calc::{self, PerformanceSummary};
use crate::ipc::error::{err, ok};
use crate::ipc::helpers::{admin_session, db_conn, optional_f64, optional_i64, store_err};
use crate::ipc::types::{AppState, Request};
use crate::ranking::{self, RankMetric};
use serde_json::json;

const DEFAULT_TOP_N: i64 = 10;
const DEFAULT_FAIL_THRESHOLD: f64 = 40.0;

fn parse_metric(req: &Request) -> Result<RankMetric, serde_json::Value> {
    match req.params.get("metric").and_then(|v| v.as_str()) {
        None => Ok(RankMetric::default()),
        Some(raw) => RankMetric::parse(raw).ok_or_else(|| {
            err(
                &req.id,
                "bad_params",
                "metric must be one of: percentage, totalObtained",
                Some(json!({ "metric": raw })),
            )
        }),
    }
}

/// Shared prologue: workspace, admin session, and a fresh performance pass.
fn load_performance(
    state: &AppState,
    req: &Request,
) -> Result<Vec<PerformanceSummary>, serde_json::Value> {
    let conn = db_conn(state, req)?;
    admin_session(state, req)?;
    calc::compute_performance(conn).map_err(|e| store_err(req, e))
}

fn handle_reports_performance(state: &mut AppState, req: &Request) -> serde_json::Value {
    match load_performance(state, req) {
        Ok(summaries) => ok(&req.id, json!({ "students": summaries })),
        Err(e) => e,
    }
}

fn handle_reports_rankings(state: &mut AppState, req: &Request) -> serde_json::Value {
    let metric = match parse_metric(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let summaries = match load_performance(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let ranked = ranking::rank(&summaries, metric);
    ok(
        &req.id,
        json!({ "metric": metric.as_str(), "rankings": ranked }),
    )
}

fn handle_reports_top_n(state: &mut AppState, req: &Request) -> serde_json::Value {
    let metric = match parse_metric(req) {
        Ok(v) => v,
        Err(e) => return e,
    };
    let n = match optional_i64(req, "n") {
        Ok(v) => v.unwrap_or(DEFAULT_TOP_N),
        Err(e) => return e,
    };
    if n < 0 {
        return err(
            &req.id,
            "bad_params",
            "n must be >= 0",
            Some(json!({ "n": n })),
        );
    }
    let summaries = match load_performance(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let top = ranking::top_n(&summaries, n as usize, metric);
    ok(
        &req.id,
        json!({ "metric": metric.as_str(), "n": n, "rankings": top }),
    )
}

fn handle_reports_below_threshold(state: &mut AppState, req: &Request) -> serde_json::Value {
    let threshold = match optional_f64(req, "threshold") {
        Ok(v) => v.unwrap_or(DEFAULT_FAIL_THRESHOLD),
        Err(e) => return e,
    };
    if !threshold.is_finite() {
        return err(&req.id, "bad_params", "threshold must be finite", None);
    }
    let summaries = match load_performance(state, req) {
        Ok(v) => v,
        Err(e) => return e,
    };

    let failing = ranking::below_threshold(&summaries, threshold);
    ok(
        &req.id,
        json!({ "threshold": threshold, "students": failing }),
    )
}

pub fn try_handle(state: &mut AppState, req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "reports.performance" => Some(handle_reports_performance(state, req)),
        "reports.rankings" => Some(handle_reports_rankings(state, req)),
        "reports.topN" => Some(handle_reports_top_n(state, req)),
        "reports.belowThreshold" => Some(handle_reports_below_threshold(state, req)),
        _ => None,
    }
}
