//! Integration tests for the decode/encode pipeline.

use std::any::Any;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hookwire::prelude::*;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

// =========================================================================
// Records
// =========================================================================

fn pipeline() -> Pipeline {
    Pipeline::builder()
        .cache(Arc::new(InspectionCache::new()))
        .build()
}

/// No hooks, no wrapped fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
struct Champion {
    id: u32,
    name: String,
    tags: Vec<String>,
}

impl Hooked for Champion {
    fn declare(_decl: &mut Declaration<Self>) {}
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Inner {
    a: i64,
}

#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Ban {
    champion_id: u32,
    pick_turn: u8,
}

/// A match record with every kind of wrapped field.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct MatchSummary {
    game_id: u64,
    kills: u32,
    deaths: u32,
    #[serde(skip)]
    meta: Option<Inner>,
    #[serde(skip)]
    bans: Vec<Ban>,
    #[serde(skip)]
    trades: Vec<Ban>,
    #[serde(skip)]
    extras: Vec<Value>,
    #[serde(skip)]
    kda: f64,
}

impl MatchSummary {
    fn derive_kda(&mut self) -> HookResult {
        self.kda = f64::from(self.kills) / f64::from(self.deaths.max(1));
        Ok(())
    }
}

impl Hooked for MatchSummary {
    fn declare(decl: &mut Declaration<Self>) {
        decl.post_decode("derive_kda", Self::derive_kda)
            .wrapped_object("meta", "meta_j", "Inner", |m: &mut Self| &mut m.meta)
            .wrapped_array("bans", "bans_j", "Bans", |m: &mut Self| &mut m.bans)
            .wrapped_constant_array("trades", "trades_j", "Trades", |m: &mut Self| {
                &mut m.trades
            })
            .wrapped_raw_array("extras", "extras_j", "Extras", |m: &mut Self| {
                &mut m.extras
            });
    }
}

/// Something a live client would hand to decoded records.
#[derive(Debug)]
struct Session {
    id: u64,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Friend {
    summoner: String,
    #[serde(skip)]
    session: Option<u64>,
    #[serde(skip)]
    observed: Option<usize>,
}

impl Hooked for Friend {
    fn declare(decl: &mut Declaration<Self>) {
        decl.context_inject("attach_session", |f: &mut Friend, s: &Arc<Session>| {
            f.session = Some(s.id);
            f.observed = Some(Arc::as_ptr(s) as usize);
            Ok(())
        });
    }
}

#[derive(Debug)]
struct NegativeGold(i64);

impl std::fmt::Display for NegativeGold {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "gold can't be negative, got {}", self.0)
    }
}

impl std::error::Error for NegativeGold {}

#[derive(Debug, Serialize, Deserialize)]
struct Wallet {
    gold: i64,
}

impl Hooked for Wallet {
    fn declare(decl: &mut Declaration<Self>) {
        decl.post_decode("check_gold", |w: &mut Wallet| {
            if w.gold < 0 {
                return Err(NegativeGold(w.gold).into());
            }
            Ok(())
        });
    }
}

/// Pre-encode hook fills wire state from a derived field.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Loadout {
    #[serde(skip)]
    items: Vec<u32>,
    item_csv: String,
}

impl Hooked for Loadout {
    fn declare(decl: &mut Declaration<Self>) {
        decl.pre_encode("join_items", |l: &mut Loadout| {
            l.item_csv = l
                .items
                .iter()
                .map(u32::to_string)
                .collect::<Vec<_>>()
                .join(",");
            Ok(())
        });
    }
}

// =========================================================================
// Passthrough
// =========================================================================

#[test]
fn test_decode_without_hooks_matches_bare_codec() {
    let pipeline = pipeline();
    let wire = json!({"id": 7, "name": "Leblanc", "tags": ["mage", "assassin"]});

    let through: Champion = pipeline.decode(&wire).unwrap();
    let bare: Champion = JsonCodec.decode(&wire).unwrap();
    assert_eq!(through, bare);

    let mut champion = through.clone();
    assert_eq!(
        pipeline.encode(&mut champion).unwrap(),
        JsonCodec.encode(&bare).unwrap()
    );
    assert!(pipeline.cache().profile::<Champion>().unwrap().is_passthrough());
}

#[test]
fn test_decode_without_hooks_reports_base_codec_error() {
    let err = pipeline()
        .decode::<Champion>(&json!({"id": "seven"}))
        .unwrap_err();
    assert!(matches!(
        err,
        HookwireError::Wire(WireError::Decode { ty: "Champion", .. })
    ));
}

// =========================================================================
// Wrapped fields
// =========================================================================

#[test]
fn test_decode_meta_scenario_fills_wrapped_object() {
    let wire = json!({
        "game_id": 1, "kills": 0, "deaths": 0,
        "meta_j": "{\"Inner\":{\"a\":1}}"
    });
    let summary: MatchSummary = pipeline().decode(&wire).unwrap();
    assert_eq!(summary.meta, Some(Inner { a: 1 }));
}

#[test]
fn test_decode_meta_scenario_absent_wrapper_is_default() {
    let wire = json!({"game_id": 1, "kills": 0, "deaths": 0});
    let summary: MatchSummary = pipeline().decode(&wire).unwrap();
    assert_eq!(summary.meta, None);
    assert!(summary.bans.is_empty());
    assert!(summary.extras.is_empty());
}

#[test]
fn test_decode_wrapped_arrays() {
    let wire = json!({
        "game_id": 1, "kills": 0, "deaths": 0,
        "bans_j": "{\"Bans\":[{\"champion_id\":12,\"pick_turn\":1}]}",
        "extras_j": "{\"Extras\":[1,\"two\"]}"
    });
    let summary: MatchSummary = pipeline().decode(&wire).unwrap();
    assert_eq!(summary.bans, vec![Ban { champion_id: 12, pick_turn: 1 }]);
    assert_eq!(summary.extras, vec![json!(1), json!("two")]);
}

#[test]
fn test_decode_constant_array_ignores_any_wire_content() {
    let pipeline = pipeline();
    let contents = [
        json!("{\"Trades\":[{\"champion_id\":1,\"pick_turn\":1}]}"),
        // Would fail to parse if anything looked at it.
        json!("{{{ not json"),
        json!(42),
        json!(null),
    ];

    for content in contents {
        let wire = json!({
            "game_id": 1, "kills": 0, "deaths": 0,
            "trades_j": content.clone()
        });
        let summary: MatchSummary = pipeline.decode(&wire).unwrap();
        assert!(summary.trades.is_empty(), "content: {content}");
    }
}

#[test]
fn test_decode_malformed_wrapper_fails_whole_decode() {
    let wire = json!({
        "game_id": 1, "kills": 0, "deaths": 0,
        "meta_j": "{\"Inner\":"
    });
    let err = pipeline().decode::<MatchSummary>(&wire).unwrap_err();
    match err {
        HookwireError::Wire(WireError::MalformedEmbedded {
            ty,
            field,
            outer_key,
            ..
        }) => {
            assert_eq!(ty, "MatchSummary");
            assert_eq!(field, "meta");
            assert_eq!(outer_key, "meta_j");
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_failure_does_not_poison_cache() {
    let pipeline = pipeline();
    let bad = json!({"game_id": 1, "kills": 0, "deaths": 0, "meta_j": 5});
    assert!(pipeline.decode::<MatchSummary>(&bad).is_err());

    let entries = pipeline.cache().len();
    let good = json!({"game_id": 2, "kills": 4, "deaths": 2});
    let summary: MatchSummary = pipeline.decode(&good).unwrap();
    assert_eq!(summary.kda, 2.0);
    assert_eq!(pipeline.cache().len(), entries);
}

#[test]
fn test_encode_then_decode_restores_wrapped_fields() {
    let pipeline = pipeline();
    let mut original = MatchSummary {
        game_id: 9,
        kills: 6,
        deaths: 3,
        meta: Some(Inner { a: 41 }),
        bans: vec![
            Ban { champion_id: 1, pick_turn: 1 },
            Ban { champion_id: 2, pick_turn: 2 },
        ],
        extras: vec![json!({"x": true})],
        ..MatchSummary::default()
    };

    let wire = pipeline.encode(&mut original).unwrap();
    assert!(wire["meta_j"].is_string());
    assert_eq!(wire["trades_j"], json!("{\"Trades\":[]}"));

    let decoded: MatchSummary = pipeline.decode(&wire).unwrap();
    assert_eq!(decoded.meta, original.meta);
    assert_eq!(decoded.bans, original.bans);
    assert_eq!(decoded.extras, original.extras);
    assert_eq!(decoded.kda, 2.0);
}

#[test]
fn test_encode_to_vec_then_decode_slice() {
    let pipeline = pipeline();
    let mut original = MatchSummary {
        game_id: 3,
        meta: Some(Inner { a: -1 }),
        ..MatchSummary::default()
    };

    let bytes = pipeline.encode_to_vec(&mut original).unwrap();
    let decoded: MatchSummary = pipeline.decode_slice(&bytes).unwrap();
    assert_eq!(decoded.meta, Some(Inner { a: -1 }));
}

#[test]
fn test_encode_leaves_out_empty_wrapped_object() {
    let mut summary = MatchSummary::default();
    let wire = pipeline().encode(&mut summary).unwrap();
    assert!(wire.get("meta_j").is_none());
}

// =========================================================================
// Hooks
// =========================================================================

#[test]
fn test_decode_post_decode_hook_is_deterministic() {
    let pipeline = pipeline();
    let wire = json!({"game_id": 1, "kills": 7, "deaths": 2});

    let first: MatchSummary = pipeline.decode(&wire).unwrap();
    let second: MatchSummary = pipeline.decode(&wire).unwrap();
    assert_eq!(first.kda, 3.5);
    assert_eq!(first, second);
}

#[test]
fn test_decode_failing_hook_returns_hook_error() {
    let err = pipeline()
        .decode::<Wallet>(&json!({"gold": -5}))
        .unwrap_err();

    match err {
        HookwireError::Hook {
            ty,
            member,
            role,
            source,
        } => {
            assert_eq!(ty, "Wallet");
            assert_eq!(member, "check_gold");
            assert_eq!(role, Role::PostDecode);
            let cause = source.downcast_ref::<NegativeGold>().unwrap();
            assert_eq!(cause.0, -5);
        }
        other => panic!("unexpected error: {other}"),
    }
}

#[test]
fn test_decode_passing_hook_returns_instance() {
    let wallet: Wallet = pipeline().decode(&json!({"gold": 100})).unwrap();
    assert_eq!(wallet.gold, 100);
}

#[test]
fn test_encode_runs_pre_encode_hook_first() {
    let mut loadout = Loadout {
        items: vec![3070, 6672],
        ..Loadout::default()
    };
    let wire = pipeline().encode(&mut loadout).unwrap();
    assert_eq!(wire, json!({"item_csv": "3070,6672"}));
    assert_eq!(loadout.item_csv, "3070,6672");
}

// =========================================================================
// Context injection
// =========================================================================

#[test]
fn test_decode_with_context_hook_observes_exact_context() {
    let session = Arc::new(Session { id: 77 });
    let friend: Friend = pipeline()
        .decode_with_context(&json!({"summoner": "Faker"}), &session)
        .unwrap();

    assert_eq!(friend.session, Some(77));
    assert_eq!(friend.observed, Some(Arc::as_ptr(&session) as usize));
}

#[test]
fn test_decode_without_context_leaves_inject_member_untouched() {
    let friend: Friend = pipeline().decode(&json!({"summoner": "Faker"})).unwrap();
    assert_eq!(friend.summoner, "Faker");
    assert_eq!(friend.session, None);
    assert_eq!(friend.observed, None);
}

#[test]
fn test_decode_with_missing_optional_context_is_usage_error() {
    let err = pipeline()
        .decode_with_optional_context::<Friend>(&json!({"summoner": "Faker"}), None)
        .unwrap_err();
    assert!(matches!(
        err,
        HookwireError::MissingContext { ty: "Friend", member: "attach_session" }
    ));
    assert_eq!(err.role(), Some(Role::ContextInject));
}

#[test]
fn test_decode_with_optional_context_some_runs_hook() {
    let session = Arc::new(Session { id: 5 });
    let context: &dyn Any = &session;
    let friend: Friend = pipeline()
        .decode_with_optional_context(&json!({"summoner": "Caps"}), Some(context))
        .unwrap();
    assert_eq!(friend.session, Some(5));
}

#[test]
fn test_decode_slice_with_context() {
    let session = Arc::new(Session { id: 8 });
    let friend: Friend = pipeline()
        .decode_slice_with_context(br#"{"summoner":"Rekkles"}"#, &session)
        .unwrap();
    assert_eq!(friend.session, Some(8));
}

// =========================================================================
// Inheritance and caching
// =========================================================================

static COUNTED_BASE_DECLARES: AtomicUsize = AtomicUsize::new(0);
static COUNTED_MATCH_DECLARES: AtomicUsize = AtomicUsize::new(0);

#[derive(Debug, Default, Serialize, Deserialize)]
struct CountedBase {
    game_id: u64,
}

impl Hooked for CountedBase {
    fn declare(decl: &mut Declaration<Self>) {
        COUNTED_BASE_DECLARES.fetch_add(1, Ordering::SeqCst);
        decl.post_decode("stamp_base", |_| Ok(()));
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct CountedMatch {
    #[serde(flatten)]
    base: CountedBase,
}

impl Hooked for CountedMatch {
    fn declare(decl: &mut Declaration<Self>) {
        COUNTED_MATCH_DECLARES.fetch_add(1, Ordering::SeqCst);
        decl.post_decode("stamp_ranked", |_| Ok(()))
            .inherit(|m: &mut CountedMatch| &mut m.base);
    }
}

#[test]
fn test_members_for_derived_type_lists_base_hook_first_and_walks_once() {
    let cache = InspectionCache::new();

    let first = cache.members_for::<CountedMatch>(Role::PostDecode).unwrap();
    let names: Vec<_> = first.iter().map(|m| m.name()).collect();
    assert_eq!(names, ["stamp_base", "stamp_ranked"]);

    let second = cache.members_for::<CountedMatch>(Role::PostDecode).unwrap();
    assert!(Arc::ptr_eq(&first, &second));
    assert_eq!(COUNTED_BASE_DECLARES.load(Ordering::SeqCst), 1);
    assert_eq!(COUNTED_MATCH_DECLARES.load(Ordering::SeqCst), 1);
}

/// Base record with its own hook and wrapped object.
#[derive(Debug, Default, Serialize, Deserialize)]
struct BaseMatch {
    game_id: u64,
    #[serde(skip)]
    meta: Option<Inner>,
    #[serde(skip)]
    trail: Vec<String>,
}

impl Hooked for BaseMatch {
    fn declare(decl: &mut Declaration<Self>) {
        decl.post_decode("stamp_base", |m: &mut BaseMatch| {
            m.trail.push("base".into());
            Ok(())
        })
        .wrapped_object("meta", "meta_j", "Inner", |m: &mut Self| &mut m.meta);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct RankedMatch {
    #[serde(flatten)]
    base: BaseMatch,
    lp_change: i32,
}

impl Hooked for RankedMatch {
    fn declare(decl: &mut Declaration<Self>) {
        decl.post_decode("stamp_ranked", |m: &mut RankedMatch| {
            m.base.trail.push("ranked".into());
            Ok(())
        })
        .inherit(|m: &mut RankedMatch| &mut m.base);
    }
}

#[test]
fn test_decode_derived_type_runs_base_hook_first() {
    let ranked: RankedMatch = pipeline()
        .decode(&json!({"game_id": 11, "lp_change": 18}))
        .unwrap();
    assert_eq!(ranked.base.game_id, 11);
    assert_eq!(ranked.lp_change, 18);
    assert_eq!(ranked.base.trail, ["base", "ranked"]);
    assert_eq!(ranked.base.meta, None);
}

#[test]
fn test_decode_derived_type_fills_base_wrapped_object() {
    let wire = json!({
        "game_id": 12,
        "lp_change": -15,
        "meta_j": "{\"Inner\":{\"a\":4}}"
    });
    let ranked: RankedMatch = pipeline().decode(&wire).unwrap();
    assert_eq!(ranked.base.meta, Some(Inner { a: 4 }));
    assert_eq!(ranked.base.trail, ["base", "ranked"]);
}

#[test]
fn test_encode_derived_type_rewraps_base_wrapped_object() {
    let pipeline = pipeline();
    let mut ranked = RankedMatch {
        base: BaseMatch {
            game_id: 13,
            meta: Some(Inner { a: 9 }),
            trail: Vec::new(),
        },
        lp_change: 21,
    };

    let tree = pipeline.encode(&mut ranked).unwrap();
    assert_eq!(tree["game_id"], 13);
    assert_eq!(tree["lp_change"], 21);
    let embedded: Value = serde_json::from_str(tree["meta_j"].as_str().unwrap()).unwrap();
    assert_eq!(embedded, json!({"Inner": {"a": 9}}));

    let back: RankedMatch = pipeline.decode(&tree).unwrap();
    assert_eq!(back.base.game_id, 13);
    assert_eq!(back.base.meta, Some(Inner { a: 9 }));
    assert_eq!(back.lp_change, 21);
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Conflicted {
    id: u32,
}

impl Hooked for Conflicted {
    fn declare(decl: &mut Declaration<Self>) {
        decl.pre_encode("sync", |_| Ok(())).post_decode("sync", |_| Ok(()));
    }
}

#[test]
fn test_decode_conflicting_declaration_is_reported() {
    let pipeline = pipeline();
    let err = pipeline.decode::<Conflicted>(&json!({"id": 1})).unwrap_err();
    assert!(matches!(
        err,
        HookwireError::Declaration(DeclarationError::RoleConflict { member: "sync", .. })
    ));

    // Other types still decode through the same cache.
    let wallet: Wallet = pipeline.decode(&json!({"gold": 1})).unwrap();
    assert_eq!(wallet.gold, 1);
}

// =========================================================================
// Nested values
// =========================================================================

/// Hooked record that only ever appears inside other records.
#[derive(Debug, Default, Clone, PartialEq, Serialize, Deserialize)]
struct Participant {
    name: String,
    kills: u32,
    #[serde(default)]
    tag: String,
    #[serde(skip)]
    doubled: u32,
    #[serde(skip)]
    meta: Option<Inner>,
}

impl Hooked for Participant {
    fn declare(decl: &mut Declaration<Self>) {
        decl.post_decode("double_kills", |p: &mut Participant| {
            p.doubled = p.kills * 2;
            Ok(())
        })
        .pre_encode("sync_tag", |p: &mut Participant| {
            p.tag = format!("{}#{}", p.name, p.kills);
            Ok(())
        })
        .wrapped_object("meta", "meta_j", "Inner", |p: &mut Self| &mut p.meta);
    }
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Game {
    game_id: u64,
    #[serde(with = "hookwire::nested::vec")]
    participants: Vec<Participant>,
    #[serde(default, with = "hookwire::nested::option")]
    mvp: Option<Participant>,
}

impl Hooked for Game {
    fn declare(_decl: &mut Declaration<Self>) {}
}

/// Wrapped fields whose targets are themselves `Hooked`.
#[derive(Debug, Default, Serialize, Deserialize)]
struct Scoreboard {
    game_id: u64,
    #[serde(skip)]
    top: Option<Wired<Participant>>,
    #[serde(skip)]
    bench: Vec<Wired<Participant>>,
}

impl Hooked for Scoreboard {
    fn declare(decl: &mut Declaration<Self>) {
        decl.wrapped_object("top", "top_j", "Participant", |s: &mut Self| &mut s.top)
            .wrapped_array("bench", "bench_j", "Bench", |s: &mut Self| &mut s.bench);
    }
}

#[derive(Debug, Deserialize)]
struct Treasury {
    #[serde(with = "hookwire::nested")]
    wallet: Wallet,
}

impl Hooked for Treasury {
    fn declare(_decl: &mut Declaration<Self>) {}
}

fn participant_wire(name: &str, kills: u32, a: i64) -> Value {
    json!({
        "name": name,
        "kills": kills,
        "meta_j": json!({"Inner": {"a": a}}).to_string(),
    })
}

#[test]
fn test_decode_nested_vec_matches_direct_decode() {
    let pipeline = pipeline();
    let wire = participant_wire("Faker", 3, 1);

    let direct: Participant = pipeline.decode(&wire).unwrap();
    let game: Game = pipeline
        .decode(&json!({"game_id": 1, "participants": [wire]}))
        .unwrap();

    assert_eq!(direct.doubled, 6);
    assert_eq!(direct.meta, Some(Inner { a: 1 }));
    assert_eq!(game.participants, [direct]);
    assert_eq!(game.mvp, None);
}

#[test]
fn test_decode_nested_option_runs_hooks() {
    let game: Game = pipeline()
        .decode(&json!({
            "game_id": 2,
            "participants": [],
            "mvp": participant_wire("Chovy", 5, 7),
        }))
        .unwrap();
    let mvp = game.mvp.unwrap();
    assert_eq!(mvp.doubled, 10);
    assert_eq!(mvp.meta, Some(Inner { a: 7 }));
}

#[test]
fn test_decode_nested_uses_outer_pipeline_cache() {
    let pipeline = pipeline();
    let _: Game = pipeline
        .decode(&json!({"game_id": 3, "participants": [participant_wire("Zeus", 1, 0)]}))
        .unwrap();

    let profile = pipeline.cache().profile::<Participant>().unwrap();
    assert_eq!(profile.post_decode, 1);
    // Game and Participant, five roles each.
    assert_eq!(pipeline.cache().len(), 10);
}

#[test]
fn test_decode_nested_hook_failure_fails_outer_decode() {
    let err = pipeline()
        .decode::<Treasury>(&json!({"wallet": {"gold": -3}}))
        .unwrap_err();
    assert!(matches!(err, HookwireError::Wire(WireError::Decode { .. })));
    assert!(err.to_string().contains("check_gold"));
}

#[test]
fn test_encode_nested_vec_runs_pre_encode_and_rewraps() {
    let pipeline = pipeline();
    let mut game = Game {
        game_id: 4,
        participants: vec![Participant {
            name: "Keria".into(),
            kills: 2,
            meta: Some(Inner { a: 3 }),
            ..Participant::default()
        }],
        mvp: None,
    };

    let tree = pipeline.encode(&mut game).unwrap();
    let wire = &tree["participants"][0];
    assert_eq!(wire["tag"], "Keria#2");
    assert!(wire["meta_j"].is_string());
    // Hooks ran on a copy.
    assert_eq!(game.participants[0].tag, "");

    let back: Game = pipeline.decode(&tree).unwrap();
    assert_eq!(back.participants[0].meta, Some(Inner { a: 3 }));
    assert_eq!(back.participants[0].doubled, 4);
}

#[test]
fn test_decode_hooked_wrapped_targets_run_their_lifecycle() {
    let top = json!({"Participant": participant_wire("Gumayusi", 4, 2)}).to_string();
    let bench = json!({"Bench": [participant_wire("Oner", 1, 5)]}).to_string();
    let board: Scoreboard = pipeline()
        .decode(&json!({"game_id": 5, "top_j": top, "bench_j": bench}))
        .unwrap();

    let top = board.top.unwrap();
    assert_eq!(top.doubled, 8);
    assert_eq!(top.meta, Some(Inner { a: 2 }));
    assert_eq!(board.bench.len(), 1);
    assert_eq!(board.bench[0].doubled, 2);
    assert_eq!(board.bench[0].meta, Some(Inner { a: 5 }));
}

#[test]
fn test_encode_hooked_wrapped_target_runs_pre_encode() {
    let pipeline = pipeline();
    let mut board = Scoreboard {
        game_id: 6,
        top: Some(Wired(Participant {
            name: "Ruler".into(),
            kills: 7,
            ..Participant::default()
        })),
        bench: Vec::new(),
    };

    let tree = pipeline.encode(&mut board).unwrap();
    let embedded: Value = serde_json::from_str(tree["top_j"].as_str().unwrap()).unwrap();
    assert_eq!(embedded["Participant"]["tag"], "Ruler#7");

    let back: Scoreboard = pipeline.decode(&tree).unwrap();
    assert_eq!(back.top.unwrap().doubled, 14);
}

// =========================================================================
// Concurrency
// =========================================================================

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_decodes_share_one_pipeline() {
    let pipeline = pipeline();
    let session = Arc::new(Session { id: 1 });

    let mut handles = Vec::new();
    for i in 0..32_u64 {
        let pipeline = pipeline.clone();
        let session = Arc::clone(&session);
        handles.push(tokio::spawn(async move {
            let wire = json!({
                "game_id": i, "kills": i, "deaths": 1,
                "meta_j": format!("{{\"Inner\":{{\"a\":{i}}}}}")
            });
            let summary: MatchSummary = pipeline.decode(&wire).unwrap();
            let friend: Friend = pipeline
                .decode_with_context(&json!({"summoner": format!("p{i}")}), &session)
                .unwrap();
            (summary, friend)
        }));
    }

    for (i, handle) in handles.into_iter().enumerate() {
        let (summary, friend) = handle.await.unwrap();
        assert_eq!(summary.game_id, i as u64);
        assert_eq!(summary.meta, Some(Inner { a: i as i64 }));
        assert_eq!(summary.kda, i as f64);
        assert_eq!(friend.session, Some(1));
    }

    let profile = pipeline.cache().profile::<MatchSummary>().unwrap();
    assert_eq!(profile.wrapped_arrays, 3);
    assert_eq!(profile.wrapped_objects, 1);
}
