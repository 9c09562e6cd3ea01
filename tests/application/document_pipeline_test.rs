use std::sync::Arc;

use boardlens::application::ports::{
    BlobStore, BlobStoreError, PartitionRequest, PartitionResponse, PartitionStrategy, Partitioner,
    PartitionerError, UploadOptions,
};
use boardlens::application::services::{
    DocumentPipeline, NEXT_DOCUMENT_DIVIDER, PipelineError, PipelineSettings,
};
use boardlens::domain::{RawElement, SourceFile, SplitterConfig, StoragePath};
use boardlens::infrastructure::partitioning::MockPartitioner;
use boardlens::infrastructure::storage::ObjectBlobStore;
use boardlens::infrastructure::text_processing::RecursiveTextSplitter;

struct StalledPartitioner;

#[async_trait::async_trait]
impl Partitioner for StalledPartitioner {
    async fn partition(
        &self,
        _request: PartitionRequest<'_>,
    ) -> Result<PartitionResponse, PartitionerError> {
        std::future::pending().await
    }
}

fn pipeline_with(
    partitioner: Arc<dyn Partitioner>,
    blob_store: Arc<dyn BlobStore>,
    settings: PipelineSettings,
) -> DocumentPipeline {
    DocumentPipeline::new(
        partitioner,
        blob_store,
        Arc::new(RecursiveTextSplitter::default()),
        settings,
    )
}

fn pipeline(partitioner: Arc<MockPartitioner>) -> DocumentPipeline {
    pipeline_with(
        partitioner,
        Arc::new(ObjectBlobStore::in_memory("memory://test")),
        PipelineSettings::default(),
    )
}

fn pdf(name: &str, text: &str) -> SourceFile {
    SourceFile::new(name, text.as_bytes().to_vec())
}

#[tokio::test]
async fn given_two_pdfs_when_processing_then_sections_are_combined_in_input_order() {
    let partitioner = Arc::new(MockPartitioner::new());
    let pipeline = pipeline(Arc::clone(&partitioner));
    let files = vec![pdf("a.pdf", "alpha"), pdf("b.pdf", "beta")];

    let batch = pipeline.process(&files).await.unwrap();

    assert_eq!(batch.files.len(), 2);
    assert_eq!(batch.files[0].file_name, "a.pdf");
    assert_eq!(batch.combined_text.matches(NEXT_DOCUMENT_DIVIDER).count(), 1);
    let a = batch.combined_text.find("=== Document: a.pdf ===").unwrap();
    let b = batch.combined_text.find("=== Document: b.pdf ===").unwrap();
    assert!(a < b);
    assert!(batch.combined_text.contains("[File: a.pdf, Page: unknown] [unknown]: alpha"));
}

#[tokio::test]
async fn given_partitioner_returns_500_when_processing_then_extraction_fails_naming_the_file() {
    let partitioner = Arc::new(MockPartitioner::new().with_status("b.pdf", 500));
    let pipeline = pipeline(partitioner);
    let files = vec![pdf("a.pdf", "alpha"), pdf("b.pdf", "beta")];

    let err = pipeline.process(&files).await.unwrap_err();

    assert!(matches!(err, PipelineError::ExtractionFailed { .. }));
    assert_eq!(err.file_name(), Some("b.pdf"));
    assert!(err.to_string().contains("500"));
}

#[tokio::test]
async fn given_partitioner_returns_no_elements_when_extracting_then_file_fails() {
    let partitioner = Arc::new(MockPartitioner::new().with_elements("empty.pdf", Vec::new()));
    let pipeline = pipeline(partitioner);

    let err = pipeline.extract(&pdf("empty.pdf", "")).await.unwrap_err();

    assert_eq!(
        err.to_string(),
        "failed to extract text from empty.pdf: partitioning service returned no elements"
    );
}

#[tokio::test]
async fn given_unsupported_file_in_batch_when_processing_then_no_partition_call_is_made() {
    let partitioner = Arc::new(MockPartitioner::new());
    let pipeline = pipeline(Arc::clone(&partitioner));
    let files = vec![pdf("a.pdf", "alpha"), pdf("notes.txt", "plain")];

    let err = pipeline.process(&files).await.unwrap_err();

    assert!(matches!(err, PipelineError::UnsupportedFileType { .. }));
    assert_eq!(err.file_name(), Some("notes.txt"));
    assert_eq!(partitioner.call_count(), 0);
}

#[tokio::test]
async fn given_file_types_when_extracting_then_format_specific_options_are_sent() {
    let partitioner = Arc::new(
        MockPartitioner::new()
            .with_elements("fin.xlsx", vec![RawElement::new("Table", "1,2").in_sheet("Q1")])
            .with_elements("charter.docx", vec![RawElement::new("Title", "Charter")]),
    );
    let settings = PipelineSettings {
        languages: vec!["eng".to_string(), "deu".to_string()],
        ..PipelineSettings::default()
    };
    let pipeline = pipeline_with(
        Arc::clone(&partitioner) as Arc<dyn Partitioner>,
        Arc::new(ObjectBlobStore::in_memory("memory://test")),
        settings,
    );

    pipeline.extract(&pdf("deck.pdf", "slides")).await.unwrap();
    pipeline.extract(&SourceFile::new("fin.xlsx", vec![1u8])).await.unwrap();
    pipeline.extract(&SourceFile::new("charter.docx", vec![1u8])).await.unwrap();

    let calls = partitioner.calls();
    let (_, pdf_options) = &calls[0];
    assert_eq!(pdf_options.strategy, PartitionStrategy::HiRes);
    assert!(pdf_options.split_pdf_page);
    assert_eq!(pdf_options.split_pdf_concurrency_level, Some(15));
    assert_eq!(pdf_options.languages, vec!["eng", "deu"]);

    let (_, xlsx_options) = &calls[1];
    assert!(xlsx_options.preserve_formulas);
    assert!(xlsx_options.extract_cell_formats);
    assert!(!xlsx_options.split_pdf_page);

    let (_, docx_options) = &calls[2];
    assert!(docx_options.preserve_formatting);
    assert!(docx_options.extract_images);
    assert_eq!(docx_options.split_pdf_concurrency_level, None);
}

#[tokio::test]
async fn given_document_boundaries_when_chunking_then_each_section_is_split_separately() {
    let partitioner = Arc::new(MockPartitioner::new());
    let pipeline = pipeline(partitioner);
    let files = vec![pdf("a.pdf", "alpha"), pdf("b.pdf", "beta")];

    let batch = pipeline.process(&files).await.unwrap();

    assert_eq!(batch.chunks.len(), 2);
    assert_eq!(batch.chunks[0].text, batch.files[0].section);
    assert_eq!(batch.chunks[1].text, batch.files[1].section);
    assert_eq!(batch.chunks[1].index, 1);
    assert!(batch.chunks.iter().all(|c| !c.text.contains("=== Next Document ===")));
}

#[tokio::test]
async fn given_boundaries_disabled_when_chunking_then_combined_text_is_split_as_one() {
    let partitioner = Arc::new(MockPartitioner::new());
    let settings = PipelineSettings {
        split_at_document_boundaries: false,
        ..PipelineSettings::default()
    };
    let pipeline = pipeline_with(
        partitioner,
        Arc::new(ObjectBlobStore::in_memory("memory://test")),
        settings,
    );
    let files = vec![pdf("a.pdf", "alpha"), pdf("b.pdf", "beta")];

    let batch = pipeline.process(&files).await.unwrap();

    assert_eq!(batch.chunks.len(), 1);
    assert_eq!(batch.chunks[0].text, batch.combined_text);
}

#[tokio::test]
async fn given_invalid_splitter_config_when_processing_then_fails_before_partitioning() {
    let partitioner = Arc::new(MockPartitioner::new());
    let settings = PipelineSettings {
        splitter: SplitterConfig::new(100, 100),
        ..PipelineSettings::default()
    };
    let pipeline = pipeline_with(
        Arc::clone(&partitioner) as Arc<dyn Partitioner>,
        Arc::new(ObjectBlobStore::in_memory("memory://test")),
        settings,
    );

    let err = pipeline.process(&[pdf("a.pdf", "alpha")]).await.unwrap_err();

    assert!(matches!(err, PipelineError::Configuration(_)));
    assert_eq!(partitioner.call_count(), 0);
}

#[tokio::test]
async fn given_cancel_signal_when_processing_then_returns_cancelled() {
    let pipeline = pipeline_with(
        Arc::new(StalledPartitioner),
        Arc::new(ObjectBlobStore::in_memory("memory://test")),
        PipelineSettings::default(),
    );

    let err = pipeline
        .process_until(&[pdf("a.pdf", "alpha")], std::future::ready(()))
        .await
        .unwrap_err();

    assert!(matches!(err, PipelineError::Cancelled));
    assert_eq!(err.file_name(), None);
}

#[tokio::test]
async fn given_stored_files_when_processing_stored_then_downloads_and_names_by_path() {
    let store = Arc::new(ObjectBlobStore::in_memory("memory://test"));
    let path = StoragePath::from_raw("u1/c1/minutes.pdf");
    store
        .upload(
            &path,
            bytes::Bytes::from_static(b"quorum present"),
            "application/pdf",
            UploadOptions::default(),
        )
        .await
        .unwrap();
    let pipeline = pipeline_with(
        Arc::new(MockPartitioner::new()),
        store,
        PipelineSettings::default(),
    );

    let batch = pipeline.process_stored(&[path]).await.unwrap();

    assert_eq!(batch.files[0].file_name, "minutes.pdf");
    assert!(batch.combined_text.contains("quorum present"));
}

#[tokio::test]
async fn given_missing_stored_file_when_fetching_then_download_fails_with_not_found() {
    let pipeline = pipeline(Arc::new(MockPartitioner::new()));

    let err = pipeline
        .fetch(&[StoragePath::from_raw("u1/c1/missing.pdf")])
        .await
        .unwrap_err();

    match err {
        PipelineError::DownloadFailed { path, source } => {
            assert_eq!(path, "u1/c1/missing.pdf");
            assert!(matches!(source, BlobStoreError::NotFound(_)));
        }
        other => panic!("unexpected error: {other}"),
    }
}
