mod common;

use common::{document, init_tracing, square, Call, MockEngine};
use pdf_annotation_core::{
    AnnotationError, AnnotationPlugin, AnnotationPluginConfig, CommitState, EngineError,
};
use pdf_annotation_model::AnnotationPatch;
use std::sync::Arc;

fn manual_commit_plugin(engine: &Arc<MockEngine>) -> AnnotationPlugin {
    AnnotationPlugin::builder(engine.clone())
        .config(AnnotationPluginConfig {
            auto_commit: false,
            ..Default::default()
        })
        .build()
}

#[tokio::test]
async fn commit_creates_updates_and_skips_never_synced_deletes() {
    init_tracing();
    let loaded = square(0, 10.0, 10.0);
    let engine = Arc::new(MockEngine::with_annotations(vec![loaded.clone()]));
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();

    let created = plugin.create_annotation(square(0, 100.0, 100.0), None);
    assert!(plugin.update_annotation(loaded.id, AnnotationPatch::new().with_opacity(0.5)));
    let scratch = plugin.create_annotation(square(1, 5.0, 5.0), None);
    assert!(plugin.delete_annotation(scratch));
    assert!(plugin.has_pending_changes());

    let report = plugin.commit().await.unwrap();

    assert_eq!(report.created, vec![created]);
    assert_eq!(report.updated, vec![loaded.id]);
    assert!(report.removed.is_empty());
    assert!(report.is_success());
    assert_eq!(
        engine.writes(),
        vec![
            Call::Create {
                id: created,
                with_context: false
            },
            Call::Update(loaded.id)
        ]
    );
    assert!(!plugin.has_pending_changes());

    let state = plugin.state();
    assert_eq!(state.get(created).unwrap().commit_state, CommitState::Synced);
    assert_eq!(state.get(created).unwrap().engine_id, Some(created));
    assert!(state.get(scratch).is_none());
}

#[tokio::test]
async fn failed_item_does_not_block_siblings() {
    init_tracing();
    let kept = square(0, 10.0, 10.0);
    let removed = square(0, 50.0, 50.0);
    let engine = Arc::new(MockEngine::with_annotations(vec![kept.clone(), removed.clone()]));
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();

    let fresh = square(0, 200.0, 200.0);
    engine.fail_on(fresh.id, EngineError::Failed("disk full".into()));
    plugin.create_annotation(fresh.clone(), None);
    plugin.update_annotation(kept.id, AnnotationPatch::new().with_opacity(0.25));
    plugin.delete_annotation(removed.id);

    let report = plugin.commit().await.unwrap();

    assert_eq!(
        report.failures,
        vec![(fresh.id, EngineError::Failed("disk full".into()))]
    );
    assert_eq!(report.updated, vec![kept.id]);
    assert_eq!(report.removed, vec![removed.id]);
    assert!(plugin.has_pending_changes());

    let state = plugin.state();
    assert_eq!(state.get(fresh.id).unwrap().commit_state, CommitState::New);
    assert_eq!(state.get(kept.id).unwrap().commit_state, CommitState::Synced);
    assert!(state.get(removed.id).is_none());
    assert_eq!(engine.stored_ids(0), vec![kept.id]);

    // The next commit retries only the failed creation
    engine.recover(fresh.id);
    let retry = plugin.commit().await.unwrap();
    assert_eq!(retry.created, vec![fresh.id]);
    assert_eq!(retry.operations(), 1);
    assert!(!plugin.has_pending_changes());
}

#[tokio::test]
async fn commit_without_pending_changes_is_a_no_op() {
    let engine = Arc::new(MockEngine::with_annotations(vec![square(0, 0.0, 0.0)]));
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();

    let first = plugin.commit().await.unwrap();
    let second = plugin.commit().await.unwrap();

    assert_eq!(first.operations(), 0);
    assert_eq!(second.operations(), 0);
    assert_eq!(engine.calls(), vec![Call::GetAll]);
}

#[tokio::test]
async fn deleting_a_synced_annotation_removes_it_from_the_engine() {
    let loaded = square(1, 10.0, 10.0);
    let engine = Arc::new(MockEngine::with_annotations(vec![loaded.clone()]));
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();

    assert!(plugin.delete_annotation(loaded.id));
    assert!(plugin.get_annotation(loaded.id).is_none());
    assert_eq!(
        plugin.state().get(loaded.id).unwrap().commit_state,
        CommitState::Deleted
    );

    let report = plugin.commit().await.unwrap();
    assert_eq!(report.removed, vec![loaded.id]);
    assert_eq!(engine.writes(), vec![Call::Remove(loaded.id)]);
    assert_eq!(plugin.state().tracked_len(), 0);
    assert!(engine.stored_ids(1).is_empty());
}

#[tokio::test]
async fn rejected_update_stays_dirty() {
    let loaded = square(0, 10.0, 10.0);
    let engine = Arc::new(MockEngine::with_annotations(vec![loaded.clone()]));
    engine.reject_updates_of(loaded.id);
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();

    plugin.update_annotation(loaded.id, AnnotationPatch::new().with_opacity(0.1));
    let report = plugin.commit().await.unwrap();

    assert_eq!(report.failures.len(), 1);
    assert_eq!(
        plugin.state().get(loaded.id).unwrap().commit_state,
        CommitState::Dirty
    );
    assert!(plugin.has_pending_changes());
}

#[tokio::test]
async fn commit_without_document_is_not_found() {
    let engine = Arc::new(MockEngine::default());
    let plugin = manual_commit_plugin(&engine);
    plugin.create_annotation(square(0, 0.0, 0.0), None);

    let err = plugin.commit().await.unwrap_err();
    assert_eq!(err, AnnotationError::NotFound("document".into()));
    assert!(engine.calls().is_empty());
}

#[tokio::test]
async fn annotation_on_missing_page_fails_with_not_found() {
    let engine = Arc::new(MockEngine::default());
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();

    let orphan = plugin.create_annotation(square(7, 0.0, 0.0), None);
    let report = plugin.commit().await.unwrap();

    assert_eq!(
        report.failures,
        vec![(orphan, EngineError::NotFound("page 7".into()))]
    );
    assert!(engine.writes().is_empty());
}

#[tokio::test]
async fn delete_during_in_flight_create_is_removed_by_next_commit() {
    init_tracing();
    let engine = Arc::new(MockEngine::default());
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();
    let gate = engine.hold_creations();
    let id = plugin.create_annotation(square(0, 30.0, 30.0), None);

    let (report, ()) = tokio::join!(plugin.commit(), async {
        while engine.writes().is_empty() {
            tokio::task::yield_now().await;
        }
        assert!(plugin.delete_annotation(id));
        gate.notify_one();
    });

    let report = report.unwrap();
    assert_eq!(report.created, vec![id]);
    assert!(plugin.get_annotation(id).is_none());
    assert_eq!(plugin.state().get(id).unwrap().commit_state, CommitState::Deleted);
    assert!(plugin.has_pending_changes());

    let cleanup = plugin.commit().await.unwrap();
    assert_eq!(cleanup.removed, vec![id]);
    assert_eq!(
        engine.writes(),
        vec![
            Call::Create {
                id,
                with_context: false
            },
            Call::Remove(id)
        ]
    );
    assert!(engine.stored_ids(0).is_empty());
    assert_eq!(plugin.state().tracked_len(), 0);
}

#[tokio::test]
async fn delete_during_failed_create_leaves_nothing_behind() {
    let engine = Arc::new(MockEngine::default());
    let plugin = manual_commit_plugin(&engine);
    plugin.load_document(document()).await.unwrap();
    let gate = engine.hold_creations();
    let fresh = square(0, 30.0, 30.0);
    engine.fail_on(fresh.id, EngineError::Failed("locked".into()));
    let id = plugin.create_annotation(fresh, None);

    let (report, ()) = tokio::join!(plugin.commit(), async {
        while engine.writes().is_empty() {
            tokio::task::yield_now().await;
        }
        plugin.delete_annotation(id);
        gate.notify_one();
    });

    assert_eq!(report.unwrap().failures.len(), 1);
    assert_eq!(plugin.state().tracked_len(), 0);
    assert!(!plugin.has_pending_changes());
    let next = plugin.commit().await.unwrap();
    assert_eq!(next.operations(), 0);
}
