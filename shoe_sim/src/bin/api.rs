use actix_web::{
    body::BoxBody,
    error, get,
    http::{header::ContentType, StatusCode},
    post, web, App, HttpResponse, HttpServer,
};
use clap::Parser;
use serde::Deserialize;
use shoe_sim::logger::init_logger;
use shoe_sim::prelude::*;
use std::path::PathBuf;
use std::sync::{Arc, Mutex, MutexGuard};

#[derive(Parser)]
#[command(name = "api")]
#[command(about = "Serves a blackjack table and its counting agent over HTTP")]
struct Args {
    /// Path to a TOML table configuration
    #[arg(short, long)]
    config: Option<PathBuf>,

    #[arg(long, default_value = "127.0.0.1")]
    address: String,

    #[arg(short, long, default_value_t = 8080)]
    port: u16,

    /// Enable debug logging
    #[arg(short, long)]
    verbose: bool,
}

/// The table every request acts on, plus the autopilot driving it when auto-play is on.
struct AppState {
    table: SharedTable,
    autopilot: Mutex<Option<Autopilot>>,
}

impl AppState {
    fn table(&self) -> Result<MutexGuard<'_, BlackjackTable>, UserError> {
        self.table.lock().map_err(|_| UserError::InternalError)
    }

    /// Locks the table for a manual command, which is refused while the agent is the driver.
    fn manual(&self) -> Result<MutexGuard<'_, BlackjackTable>, UserError> {
        let guard = self.table()?;
        if guard.settings().auto_play {
            return Err(UserError::AutoPlayActive);
        }
        Ok(guard)
    }
}

/// An enum that will handle user facing errors
#[derive(Debug)]
enum UserError {
    InternalError,
    AutoPlayActive,
    Conflict(String),
    BadInput(String),
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            UserError::InternalError => write!(f, "an internal error occured"),
            UserError::AutoPlayActive => {
                write!(f, "auto-play is on, turn it off before issuing manual commands")
            }
            UserError::Conflict(s) => write!(f, "{}", s),
            UserError::BadInput(s) => write!(f, "{}", s),
        }
    }
}

impl std::error::Error for UserError {}

impl error::ResponseError for UserError {
    fn error_response(&self) -> HttpResponse<BoxBody> {
        HttpResponse::build(self.status_code())
            .content_type(ContentType::plaintext())
            .body(self.to_string())
    }

    fn status_code(&self) -> StatusCode {
        match *self {
            UserError::InternalError => StatusCode::INTERNAL_SERVER_ERROR,
            UserError::AutoPlayActive => StatusCode::CONFLICT,
            UserError::Conflict(_) => StatusCode::CONFLICT,
            UserError::BadInput(_) => StatusCode::BAD_REQUEST,
        }
    }
}

impl From<GameError> for UserError {
    fn from(value: GameError) -> Self {
        match value {
            GameError::IllegalAction { .. } | GameError::DoubleNotAllowed { .. } => {
                UserError::Conflict(value.to_string())
            }
            GameError::InvalidRule(_) | GameError::InvalidSetting(_) => {
                UserError::BadInput(value.to_string())
            }
            GameError::EmptyShoe(_) | GameError::Poisoned | GameError::AgentPanicked => {
                tracing::error!(error = %value, "request failed");
                UserError::InternalError
            }
        }
    }
}

fn snapshot(table: &BlackjackTable) -> HttpResponse {
    HttpResponse::Ok().json(table.snapshot())
}

#[derive(Deserialize)]
struct BetParams {
    amount: i64,
}

#[derive(Deserialize)]
struct AutoPlayParams {
    on: bool,
}

#[derive(Deserialize)]
struct StrategyParams {
    strategy: CountingStrategy,
}

#[derive(Deserialize)]
struct TargetShoesParams {
    shoes: usize,
}

#[derive(Deserialize)]
struct ExitThresholdParams {
    threshold: f64,
}

#[get("/state")]
async fn state(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let table = app.table()?;
    Ok(snapshot(&table))
}

#[get("/history")]
async fn history(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let table = app.table()?;
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "runs": table.history(),
        "total_profit": table.total_profit(),
    })))
}

#[post("/reset")]
async fn reset(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.hard_reset();
    Ok(snapshot(&table))
}

#[post("/shoe/start")]
async fn start_shoe(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.start_new_shoe()?;
    Ok(snapshot(&table))
}

#[post("/deal")]
async fn deal(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.deal()?;
    Ok(snapshot(&table))
}

#[post("/hit")]
async fn hit(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.hit()?;
    Ok(snapshot(&table))
}

#[post("/stand")]
async fn stand(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.stand()?;
    table.play_out_dealer()?;
    Ok(snapshot(&table))
}

#[post("/double")]
async fn double(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.double()?;
    if table.phase() == RoundPhase::DealerTurn {
        table.play_out_dealer()?;
    }
    Ok(snapshot(&table))
}

#[post("/next-round")]
async fn next_round(app: web::Data<AppState>) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.next_round()?;
    Ok(snapshot(&table))
}

#[post("/bet")]
async fn bet(
    params: web::Json<BetParams>,
    app: web::Data<AppState>,
) -> Result<HttpResponse, UserError> {
    let mut table = app.manual()?;
    table.set_bet(params.amount.max(0))?;
    Ok(snapshot(&table))
}

/// Starts or stops the autopilot. A replaced or stopped handle is taken out of the slot first and joined on
/// the blocking pool, so neither the slot nor an actix worker is held while the thread winds down.
#[post("/autoplay")]
async fn autoplay(
    params: web::Json<AutoPlayParams>,
    app: web::Data<AppState>,
) -> Result<HttpResponse, UserError> {
    let retired = {
        let mut slot = app.autopilot.lock().map_err(|_| UserError::InternalError)?;
        let running = slot.as_ref().map_or(false, |a| !a.is_finished());
        if params.on && running {
            None
        } else if params.on {
            let finished = slot.take();
            *slot = Some(Autopilot::spawn(Arc::clone(&app.table))?);
            finished.map(|a| (a, false))
        } else {
            slot.take().map(|a| (a, true))
        }
    };

    if let Some((autopilot, stop)) = retired {
        let result = web::block(move || {
            if stop {
                autopilot.stop()
            } else {
                autopilot.join()
            }
        })
        .await
        .map_err(|_| UserError::InternalError)?;
        if let Err(e) = result {
            tracing::warn!(error = %e, "autopilot ended with an error");
        }
    }

    let table = app.table()?;
    Ok(snapshot(&table))
}

#[post("/strategy")]
async fn strategy(
    params: web::Json<StrategyParams>,
    app: web::Data<AppState>,
) -> Result<HttpResponse, UserError> {
    let mut table = app.table()?;
    table.set_counting_strategy(params.strategy);
    Ok(snapshot(&table))
}

#[post("/rules")]
async fn rules(
    params: web::Json<Vec<BetRule>>,
    app: web::Data<AppState>,
) -> Result<HttpResponse, UserError> {
    let mut table = app.table()?;
    table.set_bet_rules(params.into_inner())?;
    Ok(snapshot(&table))
}

#[post("/target-shoes")]
async fn target_shoes(
    params: web::Json<TargetShoesParams>,
    app: web::Data<AppState>,
) -> Result<HttpResponse, UserError> {
    let mut table = app.table()?;
    table.set_target_shoes(params.shoes)?;
    Ok(snapshot(&table))
}

#[post("/exit-threshold")]
async fn exit_threshold(
    params: web::Json<ExitThresholdParams>,
    app: web::Data<AppState>,
) -> Result<HttpResponse, UserError> {
    let mut table = app.table()?;
    table.set_exit_threshold(params.threshold)?;
    Ok(snapshot(&table))
}

fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(state)
        .service(history)
        .service(reset)
        .service(start_shoe)
        .service(deal)
        .service(hit)
        .service(stand)
        .service(double)
        .service(next_round)
        .service(bet)
        .service(autoplay)
        .service(strategy)
        .service(rules)
        .service(target_shoes)
        .service(exit_threshold);
}

fn app_state(config: TableConfig) -> web::Data<AppState> {
    web::Data::new(AppState {
        table: Arc::new(Mutex::new(BlackjackTable::new(config))),
        autopilot: Mutex::new(None),
    })
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    let args = Args::parse();
    init_logger(args.verbose);

    let config = match &args.config {
        Some(path) => TableConfig::load(path),
        None => Ok(TableConfig::default()),
    }
    .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidInput, e.to_string()))?;

    let app_state = app_state(config);

    tracing::info!(address = %args.address, port = args.port, "listening");
    HttpServer::new(move || App::new().app_data(app_state.clone()).configure(configure))
        .bind((args.address.as_str(), args.port))?
        .run()
        .await
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test;
    use serde_json::{json, Value};

    #[actix_web::test]
    async fn test_autoplay_toggle_returns_control() {
        let data = app_state(TableConfig::new().think_delay_ms(60_000).build());
        let app = test::init_service(App::new().app_data(data.clone()).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/autoplay")
            .set_json(json!({ "on": true }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["settings"]["auto_play"], json!(true));

        let req = test::TestRequest::post().uri("/deal").to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/autoplay")
            .set_json(json!({ "on": false }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["settings"]["auto_play"], json!(false));
        assert_eq!(body["phase"], json!("betting"));
        assert_eq!(body["cards_remaining"], json!(104));
        assert!(data.autopilot.lock().unwrap().is_none());

        let req = test::TestRequest::post().uri("/deal").to_request();
        let resp = test::call_service(&app, req).await;
        assert!(resp.status().is_success());
    }

    #[actix_web::test]
    async fn test_oversized_bet_is_capped_and_table_stays_usable() {
        let data = app_state(TableConfig::new().seed(5).build());
        let app = test::init_service(App::new().app_data(data).configure(configure)).await;

        let req = test::TestRequest::post()
            .uri("/bet")
            .set_json(json!({ "amount": i64::MAX }))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["bet"], json!(1_000_000));

        for uri in ["/deal", "/stand"] {
            let req = test::TestRequest::post().uri(uri).to_request();
            let resp = test::call_service(&app, req).await;
            // a dealt blackjack ends the round before the stand
            assert!(resp.status().is_success() || resp.status() == StatusCode::CONFLICT);
        }

        let req = test::TestRequest::get().uri("/state").to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(body["phase"], json!("gameOver"));
    }
}
