use std::sync::Arc;

use hookwire::prelude::*;
use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Client session
// ---------------------------------------------------------------------------

/// What the client hands to every record it decodes.
#[derive(Debug)]
struct Session {
    summoner_id: u64,
    region: String,
}

// ---------------------------------------------------------------------------
// Records
// ---------------------------------------------------------------------------

#[derive(Debug, Default, Serialize, Deserialize)]
struct GameRecord {
    game_id: u64,
    queue: String,
}

impl Hooked for GameRecord {
    fn declare(decl: &mut Declaration<Self>) {
        decl.post_decode("check_game_id", |g: &mut GameRecord| {
            if g.game_id == 0 {
                return Err("game_id 0 is reserved for custom lobbies".into());
            }
            Ok(())
        });
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Stats {
    kills: u32,
    deaths: u32,
    assists: u32,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Ban {
    champion_id: u32,
    pick_turn: u8,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RankedMatch {
    #[serde(flatten)]
    game: GameRecord,
    lp_change: i32,
    #[serde(skip)]
    stats: Option<Stats>,
    #[serde(skip)]
    bans: Vec<Ban>,
    #[serde(skip)]
    trades: Vec<Ban>,
    #[serde(skip)]
    kda: f64,
    #[serde(skip)]
    owner: Option<u64>,
}

impl Hooked for RankedMatch {
    fn declare(decl: &mut Declaration<Self>) {
        decl.inherit(|m: &mut RankedMatch| &mut m.game)
            .wrapped_object("stats", "stats_j", "Stats", |m: &mut Self| &mut m.stats)
            .wrapped_array("bans", "bans_j", "Bans", |m: &mut Self| &mut m.bans)
            .wrapped_constant_array("trades", "trades_j", "Trades", |m: &mut Self| {
                &mut m.trades
            })
            .post_decode("derive_kda", |m: &mut RankedMatch| {
                if let Some(s) = &m.stats {
                    m.kda = f64::from(s.kills + s.assists) / f64::from(s.deaths.max(1));
                }
                Ok(())
            })
            .context_inject("attach_session", |m: &mut RankedMatch, s: &Arc<Session>| {
                m.owner = Some(s.summoner_id);
                Ok(())
            });
    }
}

// ---------------------------------------------------------------------------
// Simulated backend responses
// ---------------------------------------------------------------------------

fn responses() -> Vec<String> {
    let mut out: Vec<String> = (1..=6_u64)
        .map(|game_id| {
            let stats = format!(
                r#"{{"Stats":{{"kills":{},"deaths":{},"assists":{}}}}}"#,
                game_id * 2,
                game_id % 3,
                game_id + 4
            );
            let bans = r#"{"Bans":[{"champion_id":157,"pick_turn":1}]}"#;
            let lp_change: i32 = if game_id % 2 == 0 { 18 } else { -15 };
            serde_json::json!({
                "game_id": game_id,
                "queue": "RANKED_SOLO_5x5",
                "lp_change": lp_change,
                "stats_j": stats,
                "bans_j": bans,
                "trades_j": "{\"Trades\":[]}",
            })
            .to_string()
        })
        .collect();

    // One broken wrapper and one record a hook rejects.
    out.push(
        r#"{"game_id": 7, "queue": "ARAM", "lp_change": 0, "stats_j": "{\"Stats\": {"}"#
            .to_string(),
    );
    out.push(r#"{"game_id": 0, "queue": "CUSTOM", "lp_change": 0}"#.to_string());
    out
}

/// Reads an optional wrapped-field config from the first argument.
fn load_config() -> Result<WrappedConfig, Box<dyn std::error::Error>> {
    match std::env::args().nth(1) {
        Some(path) => {
            let text = std::fs::read_to_string(&path)?;
            Ok(serde_json::from_str(&text)?)
        }
        None => Ok(WrappedConfig::default()),
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::INFO.into()),
        )
        .init();

    let pipeline = Pipeline::builder().wrapped_config(load_config()?).build();
    let session = Arc::new(Session {
        summoner_id: 4_242,
        region: "EUW".into(),
    });
    tracing::info!(summoner_id = session.summoner_id, region = %session.region, "session ready");

    let mut tasks = Vec::new();
    for body in responses() {
        let pipeline = pipeline.clone();
        let session = Arc::clone(&session);
        tasks.push(tokio::spawn(async move {
            pipeline.decode_slice_with_context::<RankedMatch, _>(body.as_bytes(), &session)
        }));
    }

    let mut decoded = Vec::new();
    for task in tasks {
        match task.await? {
            Ok(m) => {
                tracing::info!(
                    game_id = m.game.game_id,
                    queue = %m.game.queue,
                    lp_change = m.lp_change,
                    kda = m.kda,
                    first_ban = ?m.bans.first().map(|b| (b.champion_id, b.pick_turn)),
                    owner = ?m.owner,
                    "match decoded"
                );
                decoded.push(m);
            }
            Err(e) => tracing::warn!(error = %e, "match rejected"),
        }
    }

    if let Some(first) = decoded.first_mut() {
        let wire = pipeline.encode(first)?;
        tracing::info!(%wire, "re-encoded first match");
    }

    let profile = pipeline.cache().profile::<RankedMatch>()?;
    tracing::info!(
        decoded = decoded.len(),
        cached_entries = pipeline.cache().len(),
        post_decode_hooks = profile.post_decode,
        "done"
    );
    Ok(())
}
