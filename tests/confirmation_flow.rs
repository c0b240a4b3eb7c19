use std::sync::Arc;

use chrono::{DateTime, Duration, TimeZone, Utc};
use schedulerBot::config::SchedulerConfig;
use schedulerBot::handlers::engine::{
    EngineError, EngineReply, SchedulerEngine, SessionEvent, SessionStore,
};
use schedulerBot::models::intent::Intent;
use schedulerBot::models::interval::TimeInterval;
use schedulerBot::service::calendar_client::{CalendarClient, InMemoryCalendarClient};
use tokio::sync::Mutex;

fn interval(start_h: u32, start_m: u32, end_h: u32, end_m: u32) -> TimeInterval {
    TimeInterval::new(
        Utc.with_ymd_and_hms(2026, 3, 2, start_h, start_m, 0).unwrap(),
        Utc.with_ymd_and_hms(2026, 3, 2, end_h, end_m, 0).unwrap(),
    )
    .unwrap()
}

fn now() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2026, 3, 2, 6, 0, 0).unwrap()
}

fn engine_with_empty_calendar() -> (SchedulerEngine, Arc<InMemoryCalendarClient>) {
    let client = Arc::new(InMemoryCalendarClient::new(Vec::new()));
    let store = Arc::new(Mutex::new(SessionStore::new()));
    let engine = SchedulerEngine::new(store, client.clone(), SchedulerConfig::default());
    (engine, client)
}

fn create_intent(title: &str) -> Intent {
    Intent::Create {
        title: title.to_string(),
        interval: interval(9, 0, 10, 0),
    }
}

async fn propose(engine: &SchedulerEngine, intent: Intent) -> EngineReply {
    engine
        .handle_event(
            SessionEvent::IntentSubmitted {
                session_id: "s1".to_string(),
                intent,
            },
            now(),
        )
        .await
        .expect("intent should produce a reply")
}

async fn reply(
    engine: &SchedulerEngine,
    text: &str,
    at: DateTime<Utc>,
) -> Result<EngineReply, EngineError> {
    engine
        .handle_event(
            SessionEvent::ReplySubmitted {
                session_id: "s1".to_string(),
                text: text.to_string(),
            },
            at,
        )
        .await
}

#[tokio::test]
async fn confirm_phrase_commits_and_returns_provider_id() {
    let (engine, client) = engine_with_empty_calendar();

    let proposed = propose(&engine, create_intent("design review")).await;
    assert!(matches!(proposed, EngineReply::AwaitingConfirmation { .. }));

    match reply(&engine, "sounds good", now()).await.unwrap() {
        EngineReply::Committed { event, summary } => {
            assert!(event.is_persisted());
            assert_eq!(event.title, "design review");
            assert!(summary.contains("design review"));
        }
        other => panic!("expected committed, got {other:?}"),
    }

    let snapshot = client.fetch_snapshot(interval(8, 0, 12, 0)).await.unwrap();
    assert_eq!(snapshot.events().len(), 1);
}

#[tokio::test]
async fn cancel_phrase_discards_the_plan() {
    let (engine, client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;
    assert!(matches!(
        reply(&engine, "never mind", now()).await.unwrap(),
        EngineReply::Cancelled { .. }
    ));

    let snapshot = client.fetch_snapshot(interval(8, 0, 12, 0)).await.unwrap();
    assert!(snapshot.is_empty());

    // The cancelled plan is gone; a follow-up confirm has nothing to act on.
    assert!(matches!(
        reply(&engine, "yes", now()).await,
        Err(EngineError::NoPendingPlan)
    ));
}

#[tokio::test]
async fn unrecognized_reply_reprompts_without_state_change() {
    let (engine, _client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;
    match reply(&engine, "hmm what?", now()).await.unwrap() {
        EngineReply::Reprompt { summary } => assert!(summary.contains("design review")),
        other => panic!("expected reprompt, got {other:?}"),
    }

    // Plan is still proposed; a real confirmation still lands.
    assert!(matches!(
        reply(&engine, "go ahead", now()).await.unwrap(),
        EngineReply::Committed { .. }
    ));
}

#[tokio::test]
async fn timeout_cancels_and_later_confirm_is_rejected() {
    let (engine, client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;
    assert!(matches!(
        engine
            .handle_event(
                SessionEvent::TimeoutElapsed {
                    session_id: "s1".to_string()
                },
                now(),
            )
            .await
            .unwrap(),
        EngineReply::Cancelled { .. }
    ));

    assert!(matches!(
        reply(&engine, "yes", now()).await,
        Err(EngineError::NoPendingPlan)
    ));
    let snapshot = client.fetch_snapshot(interval(8, 0, 12, 0)).await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn late_reply_after_expiry_is_rejected() {
    let (engine, client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;
    let after_expiry = now() + Duration::minutes(10);
    assert!(matches!(
        reply(&engine, "yes", after_expiry).await,
        Err(EngineError::NoPendingPlan)
    ));
    let snapshot = client.fetch_snapshot(interval(8, 0, 12, 0)).await.unwrap();
    assert!(snapshot.is_empty());
}

#[tokio::test]
async fn new_intent_while_plan_pending_is_rejected() {
    let (engine, _client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;
    let second = engine
        .handle_event(
            SessionEvent::IntentSubmitted {
                session_id: "s1".to_string(),
                intent: Intent::Create {
                    title: "another".to_string(),
                    interval: interval(11, 0, 12, 0),
                },
            },
            now(),
        )
        .await;
    assert!(matches!(second, Err(EngineError::PlanPending)));

    // The original plan is untouched and can still be confirmed.
    assert!(matches!(
        reply(&engine, "yes", now()).await.unwrap(),
        EngineReply::Committed { event, .. } if event.title == "design review"
    ));
}

#[tokio::test]
async fn pending_plan_expires_lazily_for_a_new_intent() {
    let (engine, _client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;
    let after_expiry = now() + Duration::minutes(10);
    let second = engine
        .handle_event(
            SessionEvent::IntentSubmitted {
                session_id: "s1".to_string(),
                intent: create_intent("fresh start"),
            },
            after_expiry,
        )
        .await
        .unwrap();
    assert!(matches!(second, EngineReply::AwaitingConfirmation { .. }));
}

#[tokio::test]
async fn sessions_are_independent() {
    let (engine, _client) = engine_with_empty_calendar();

    propose(&engine, create_intent("design review")).await;

    // A different session plans freely while s1 has a pending plan.
    let other = engine
        .handle_event(
            SessionEvent::IntentSubmitted {
                session_id: "s2".to_string(),
                intent: Intent::List {
                    window: interval(8, 0, 18, 0),
                },
            },
            now(),
        )
        .await
        .unwrap();
    assert!(matches!(other, EngineReply::Informational { .. }));
}

#[tokio::test]
async fn informational_intents_do_not_open_a_confirmation_cycle() {
    let (engine, _client) = engine_with_empty_calendar();

    let reply_list = propose(
        &engine,
        Intent::FindSlot {
            duration_minutes: 30,
            window: interval(9, 0, 12, 0),
        },
    )
    .await;
    assert!(matches!(reply_list, EngineReply::Informational { .. }));

    // Nothing pending afterwards.
    assert!(matches!(
        reply(&engine, "yes", now()).await,
        Err(EngineError::NoPendingPlan)
    ));
}
