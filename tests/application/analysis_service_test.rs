use std::sync::Arc;

use futures::StreamExt;
use serde_json::{Value, json};

use boardlens::application::ports::{
    AnalysisRepository, BlobStore, MessagePart, MessageRole, RepositoryError, UploadOptions,
};
use boardlens::application::services::{
    AnalysisEvent, AnalysisService, AnalysisServiceError, DocumentPipeline, NewAnalysis,
    PipelineSettings,
};
use boardlens::domain::{
    Analysis, AnalysisId, AnalysisStatus, CompanyId, DocumentType, SourceFile, StoragePath, UserId,
};
use boardlens::infrastructure::llm::MockStructuredGenerator;
use boardlens::infrastructure::partitioning::MockPartitioner;
use boardlens::infrastructure::persistence::InMemoryAnalysisRepository;
use boardlens::infrastructure::storage::ObjectBlobStore;
use boardlens::infrastructure::text_processing::RecursiveTextSplitter;

/// Record store that refuses to persist completed or needs-review analyses.
struct RejectsFinishedAnalyses {
    inner: InMemoryAnalysisRepository,
}

#[async_trait::async_trait]
impl AnalysisRepository for RejectsFinishedAnalyses {
    async fn create(&self, analysis: &Analysis) -> Result<(), RepositoryError> {
        self.inner.create(analysis).await
    }

    async fn get_by_id(&self, id: AnalysisId) -> Result<Option<Analysis>, RepositoryError> {
        self.inner.get_by_id(id).await
    }

    async fn update(&self, analysis: &Analysis) -> Result<(), RepositoryError> {
        match analysis.status {
            AnalysisStatus::Completed | AnalysisStatus::NeedsReview => {
                Err(RepositoryError::QueryFailed("report column too large".to_string()))
            }
            _ => self.inner.update(analysis).await,
        }
    }

    async fn list_by_company(&self, company_id: CompanyId) -> Result<Vec<Analysis>, RepositoryError> {
        self.inner.list_by_company(company_id).await
    }
}

struct Harness {
    service: Arc<AnalysisService>,
    generator: Arc<MockStructuredGenerator>,
    repository: Arc<InMemoryAnalysisRepository>,
    blob_store: Arc<ObjectBlobStore>,
}

fn harness(partitioner: MockPartitioner, generator: MockStructuredGenerator) -> Harness {
    let blob_store = Arc::new(ObjectBlobStore::in_memory("memory://test"));
    let pipeline = Arc::new(DocumentPipeline::new(
        Arc::new(partitioner),
        Arc::clone(&blob_store) as Arc<dyn BlobStore>,
        Arc::new(RecursiveTextSplitter::default()),
        PipelineSettings::default(),
    ));
    let generator = Arc::new(generator);
    let repository = Arc::new(InMemoryAnalysisRepository::new());
    let service = Arc::new(AnalysisService::new(
        pipeline,
        generator.clone(),
        repository.clone(),
    ));
    Harness {
        service,
        generator,
        repository,
        blob_store,
    }
}

fn report(summary: &str, recommendations: &[&str], review: bool) -> Value {
    json!({
        "executiveSummary": summary,
        "keyFindings": [],
        "recommendations": recommendations,
        "requiresHumanReview": review
    })
}

fn finding_report() -> Value {
    json!({
        "executiveSummary": "Budget variance found.",
        "keyFindings": [{
            "type": "financial_discrepancy",
            "severity": "high",
            "title": "Totals differ",
            "description": "Revenue total does not match summary.",
            "location": "[File: minutes.pdf, Page: 2]"
        }],
        "recommendations": ["Reconcile totals"],
        "requiresHumanReview": false
    })
}

fn pdf(name: &str, text: &str) -> SourceFile {
    SourceFile::new(name, text.as_bytes().to_vec())
}

async fn create_analysis(service: &AnalysisService) -> AnalysisId {
    service
        .create(NewAnalysis {
            company_id: CompanyId::new(),
            analyzer_id: UserId::new("analyst"),
            document_ids: Vec::new(),
            document_type: DocumentType::Minutes,
            title: "Q1 board pack".to_string(),
        })
        .await
        .unwrap()
        .id
}

async fn stored_status(repository: &InMemoryAnalysisRepository, id: AnalysisId) -> AnalysisStatus {
    repository.get_by_id(id).await.unwrap().unwrap().status
}

#[tokio::test]
async fn given_valid_report_when_running_then_analysis_completes_with_findings() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(finding_report()));
    let id = create_analysis(&h.service).await;

    let analysis = h
        .service
        .run(id, vec![pdf("minutes.pdf", "Quorum present.")], None)
        .await
        .unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Completed);
    assert_eq!(analysis.summary.as_deref(), Some("Budget variance found."));
    assert_eq!(analysis.findings.len(), 1);
    assert_eq!(analysis.recommendations, vec!["Reconcile totals"]);
    assert_eq!(analysis.metadata["chunkCount"], 1);
    assert_eq!(analysis.metadata["documents"][0]["fileName"], "minutes.pdf");
    assert!(analysis.started_at.is_some());
    assert!(analysis.completed_at.is_some());
    assert_eq!(stored_status(&h.repository, id).await, AnalysisStatus::Completed);
}

#[tokio::test]
async fn given_single_chunk_when_running_then_request_attaches_file_and_frames_content() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(report("ok", &[], false)));
    let id = create_analysis(&h.service).await;

    h.service
        .run(
            id,
            vec![pdf("minutes.pdf", "Quorum present.")],
            Some("Check the quorum.".to_string()),
        )
        .await
        .unwrap();

    let requests = h.generator.requests();
    assert_eq!(requests.len(), 1);
    let messages = &requests[0].messages;
    assert_eq!(messages[0].role, MessageRole::System);
    assert!(messages[0].text().contains("Focus on:"));
    assert_eq!(messages[1].role, MessageRole::User);
    assert!(messages[1].parts.iter().any(|p| matches!(
        p,
        MessagePart::File { file_name, mime_type, .. }
            if file_name == "minutes.pdf" && mime_type == "application/pdf"
    )));
    let text = messages[1].text();
    assert!(text.starts_with("Check the quorum.\n\n"));
    assert!(text.contains("Analyze the following documents together:\n=== Document: minutes.pdf ==="));
    assert!(!text.contains("Part 1 of"));
}

#[tokio::test]
async fn given_report_requesting_review_when_running_then_analysis_needs_review() {
    let h = harness(
        MockPartitioner::new(),
        MockStructuredGenerator::returning(report("Critical gaps.", &[], true)),
    );
    let id = create_analysis(&h.service).await;

    let analysis = h.service.run(id, vec![pdf("a.pdf", "x")], None).await.unwrap();

    assert_eq!(analysis.status, AnalysisStatus::NeedsReview);
    assert_eq!(stored_status(&h.repository, id).await, AnalysisStatus::NeedsReview);
}

#[tokio::test]
async fn given_two_documents_when_running_then_per_part_reports_are_merged_in_order() {
    let h = harness(
        MockPartitioner::new(),
        MockStructuredGenerator::returning_each(vec![
            report("First part.", &["Hire CFO", "Review audit"], false),
            report("Second part.", &["Review audit"], false),
        ]),
    );
    let id = create_analysis(&h.service).await;

    let analysis = h
        .service
        .run(id, vec![pdf("a.pdf", "alpha"), pdf("b.pdf", "beta")], None)
        .await
        .unwrap();

    assert_eq!(analysis.summary.as_deref(), Some("First part.\n\nSecond part."));
    assert_eq!(analysis.recommendations, vec!["Hire CFO", "Review audit"]);
    assert_eq!(analysis.metadata["chunkCount"], 2);

    let requests = h.generator.requests();
    assert_eq!(requests.len(), 2);
    let first = &requests[0].messages[1];
    let second = &requests[1].messages[1];
    assert!(first.text().contains("Part 1 of 2."));
    assert!(second.text().contains("Part 2 of 2."));
    assert_eq!(
        first.parts.iter().filter(|p| matches!(p, MessagePart::File { .. })).count(),
        2
    );
    assert!(second.parts.iter().all(|p| matches!(p, MessagePart::Text(_))));
}

#[tokio::test]
async fn given_payload_not_matching_report_when_running_then_analysis_fails() {
    let h = harness(
        MockPartitioner::new(),
        MockStructuredGenerator::returning(json!({"unexpected": true})),
    );
    let id = create_analysis(&h.service).await;

    let err = h.service.run(id, vec![pdf("a.pdf", "x")], None).await.unwrap_err();

    assert!(matches!(err, AnalysisServiceError::InvalidPayload(_)));
    let stored = h.repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, AnalysisStatus::Failed);
    assert!(stored
        .error_message
        .unwrap()
        .starts_with("invalid analysis payload: part 1"));
}

#[tokio::test]
async fn given_generator_failure_when_running_then_analysis_fails_with_message() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::failing("model unavailable"));
    let id = create_analysis(&h.service).await;

    let err = h.service.run(id, vec![pdf("a.pdf", "x")], None).await.unwrap_err();

    assert!(matches!(err, AnalysisServiceError::Generation(_)));
    let stored = h.repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, AnalysisStatus::Failed);
    assert!(stored.error_message.unwrap().contains("model unavailable"));
}

#[tokio::test]
async fn given_finished_report_cannot_be_stored_when_running_then_stored_analysis_is_failed() {
    let blob_store = Arc::new(ObjectBlobStore::in_memory("memory://test"));
    let pipeline = Arc::new(DocumentPipeline::new(
        Arc::new(MockPartitioner::new()),
        blob_store as Arc<dyn BlobStore>,
        Arc::new(RecursiveTextSplitter::default()),
        PipelineSettings::default(),
    ));
    let repository = Arc::new(RejectsFinishedAnalyses {
        inner: InMemoryAnalysisRepository::new(),
    });
    let service = AnalysisService::new(
        pipeline,
        Arc::new(MockStructuredGenerator::returning(finding_report())),
        repository.clone(),
    );
    let id = create_analysis(&service).await;

    let err = service.run(id, vec![pdf("a.pdf", "x")], None).await.unwrap_err();

    assert!(matches!(err, AnalysisServiceError::Repository(_)));
    let stored = repository.get_by_id(id).await.unwrap().unwrap();
    assert_eq!(stored.status, AnalysisStatus::Failed);
    assert!(stored.error_message.unwrap().contains("report column too large"));
}

#[tokio::test]
async fn given_partitioning_returns_500_when_running_then_fails_before_calling_model() {
    let h = harness(
        MockPartitioner::new().with_status("b.pdf", 500),
        MockStructuredGenerator::returning(report("unused", &[], false)),
    );
    let id = create_analysis(&h.service).await;

    let err = h
        .service
        .run(id, vec![pdf("a.pdf", "x"), pdf("b.pdf", "y")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisServiceError::Pipeline(_)));
    assert!(err.to_string().contains("b.pdf"));
    assert_eq!(h.generator.call_count(), 0);
    assert_eq!(stored_status(&h.repository, id).await, AnalysisStatus::Failed);
}

#[tokio::test]
async fn given_unknown_id_when_running_then_not_found() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(report("x", &[], false)));

    let err = h
        .service
        .run(AnalysisId::new(), vec![pdf("a.pdf", "x")], None)
        .await
        .unwrap_err();

    assert!(matches!(err, AnalysisServiceError::NotFound(_)));
}

#[tokio::test]
async fn given_completed_analysis_when_running_again_then_transition_is_rejected() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(report("x", &[], false)));
    let id = create_analysis(&h.service).await;
    h.service.run(id, vec![pdf("a.pdf", "x")], None).await.unwrap();

    let err = h.service.run(id, vec![pdf("a.pdf", "x")], None).await.unwrap_err();

    assert!(matches!(err, AnalysisServiceError::InvalidTransition(_)));
    assert_eq!(stored_status(&h.repository, id).await, AnalysisStatus::Completed);
}

#[tokio::test]
async fn given_stored_files_when_running_stored_then_downloads_and_completes() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(report("ok", &[], false)));
    let path = StoragePath::from_raw("u1/c1/minutes.pdf");
    h.blob_store
        .upload(
            &path,
            bytes::Bytes::from_static(b"Quorum present."),
            "application/pdf",
            UploadOptions::default(),
        )
        .await
        .unwrap();
    let id = create_analysis(&h.service).await;

    let analysis = h.service.run_stored(id, &[path], None).await.unwrap();

    assert_eq!(analysis.status, AnalysisStatus::Completed);
    assert_eq!(analysis.metadata["documents"][0]["fileName"], "minutes.pdf");
}

#[tokio::test]
async fn given_streaming_run_when_consuming_then_partials_precede_finished_analysis() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(finding_report()));
    let id = create_analysis(&h.service).await;

    let events: Vec<_> = Arc::clone(&h.service)
        .run_streaming(id, vec![pdf("a.pdf", "x")], None)
        .await
        .unwrap()
        .collect()
        .await;

    let (last, partials) = events.split_last().unwrap();
    assert!(!partials.is_empty());
    for event in partials {
        match event {
            Ok(AnalysisEvent::Partial {
                chunk_index,
                total_chunks,
                ..
            }) => {
                assert_eq!(*chunk_index, 0);
                assert_eq!(*total_chunks, 1);
            }
            other => panic!("expected partial, got {other:?}"),
        }
    }
    match last {
        Ok(AnalysisEvent::Finished(analysis)) => {
            assert_eq!(analysis.status, AnalysisStatus::Completed);
            assert_eq!(analysis.findings.len(), 1);
        }
        other => panic!("expected finished analysis, got {other:?}"),
    }
    assert_eq!(stored_status(&h.repository, id).await, AnalysisStatus::Completed);
}

#[tokio::test]
async fn given_streaming_run_when_last_partial_arrives_then_it_is_the_complete_report() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::returning(finding_report()));
    let id = create_analysis(&h.service).await;

    let events: Vec<_> = Arc::clone(&h.service)
        .run_streaming(id, vec![pdf("a.pdf", "x")], None)
        .await
        .unwrap()
        .collect()
        .await;

    let last_snapshot = events
        .iter()
        .filter_map(|e| match e {
            Ok(AnalysisEvent::Partial { snapshot, .. }) => Some(snapshot.clone()),
            _ => None,
        })
        .last()
        .unwrap();
    assert_eq!(last_snapshot, finding_report());
}

#[tokio::test]
async fn given_streaming_generator_failure_when_consuming_then_stream_ends_with_error() {
    let h = harness(MockPartitioner::new(), MockStructuredGenerator::failing("boom"));
    let id = create_analysis(&h.service).await;

    let events: Vec<_> = Arc::clone(&h.service)
        .run_streaming(id, vec![pdf("a.pdf", "x")], None)
        .await
        .unwrap()
        .collect()
        .await;

    assert_eq!(events.len(), 1);
    assert!(matches!(events[0], Err(AnalysisServiceError::Generation(_))));
    assert_eq!(stored_status(&h.repository, id).await, AnalysisStatus::Failed);
}
