//! End-to-end coach round-trips over the dummy backend — no network, no key.

use formcoach::coach::{ChatSession, CoachService, UserProfile};
use formcoach::genai::{GenAiError, MediaBlob, Provider, dummy::DummyClient};
use formcoach::retry::no_progress;

fn service() -> (CoachService, DummyClient) {
    let dummy = DummyClient::new();
    (CoachService::new(Provider::Dummy(dummy.clone())), dummy)
}

#[tokio::test]
async fn scan_to_suggestions_round_trip() {
    let (svc, dummy) = service();
    let video = MediaBlob { mime_type: "video/mp4".into(), data: vec![0u8; 64] };
    let scan = svc.scan_equipment(video, no_progress).await.unwrap();

    assert_eq!(scan.equipment.len(), 2);
    assert_eq!(scan.equipment[0].name, "Flat bench");
    assert_eq!(scan.suggestions[0].target_muscles, vec!["chest", "triceps"]);
    assert_eq!(dummy.generate_calls(), 1);
}

#[tokio::test]
async fn plan_chat_and_qa_share_one_service() {
    let (svc, _) = service();

    let profile = UserProfile {
        goal: "run a faster 5k".into(),
        experience: "intermediate".into(),
        days_per_week: 4,
        session_minutes: 45,
        available_equipment: vec!["treadmill".into()],
        constraints: None,
    };
    let plan = svc.workout_plan(&profile, no_progress).await.unwrap();
    assert!(plan.markdown.contains("5k"));

    let mut session = ChatSession::new();
    svc.chat(&mut session, "Is my plan too hard?", no_progress).await.unwrap();
    assert_eq!(session.turns().len(), 2);

    let answer = svc.ask("best warm-up before running?", no_progress).await.unwrap();
    assert!(!answer.sources.is_empty());
}

#[tokio::test(start_paused = true)]
async fn demo_video_cache_skips_regeneration() {
    let (svc, dummy) = service();

    let first = svc.demo_video("Bulgarian Split Squat", no_progress).await.unwrap();
    let second = svc.demo_video("bulgarian split squat", no_progress).await.unwrap();

    assert_eq!(first, second);
    assert_eq!(dummy.video_starts(), 1, "second request must be served from cache");
}

#[tokio::test]
async fn validation_failures_never_reach_the_backend() {
    let (svc, dummy) = service();

    let empty_video = MediaBlob { mime_type: "video/mp4".into(), data: vec![] };
    assert!(matches!(
        svc.scan_equipment(empty_video, no_progress).await,
        Err(GenAiError::InvalidInput(_))
    ));

    let mut session = ChatSession::new();
    assert!(matches!(
        svc.chat(&mut session, "", no_progress).await,
        Err(GenAiError::InvalidInput(_))
    ));

    assert!(matches!(
        svc.demo_video("   ", no_progress).await,
        Err(GenAiError::InvalidInput(_))
    ));

    assert_eq!(dummy.generate_calls(), 0);
    assert_eq!(dummy.video_starts(), 0);
}
