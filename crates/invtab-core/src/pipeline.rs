//! Document pipeline: rasterize, recognize, parse, collect.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

use tracing::{debug, info};

use crate::error::{InvtabError, Result};
use crate::models::config::InvtabConfig;
use crate::models::row::Extraction;
use crate::ocr::{self, recognizer_from_config, TextRecognizer};
use crate::output::{output_path_for, write_table};
use crate::pdf::{rasterizer_from_config, PageImage, Rasterizer};
use crate::table::{RowCollector, RowParser};

/// Progress notifications emitted while a document is processed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageEvent {
    /// The document was rasterized into `pages` page images.
    Rasterized { pages: usize },
    /// Text recognition finished for `page` (1-indexed) out of `total`.
    Recognized { page: u32, total: usize },
}

/// Processes one document at a time into table rows.
///
/// Rasterization runs once per document and recognition once per page, with
/// no retries. With more than one job, pages are recognized on worker
/// threads, but rows are always collected in page order.
pub struct DocumentProcessor<R: Rasterizer, T: TextRecognizer> {
    rasterizer: R,
    recognizer: T,
    parser: RowParser,
    language: String,
    jobs: usize,
}

impl DocumentProcessor<Box<dyn Rasterizer>, Box<dyn TextRecognizer>> {
    /// Build a processor with the backends selected in `config`.
    pub fn from_config(config: &InvtabConfig) -> Result<Self> {
        let rasterizer = rasterizer_from_config(&config.pdf);
        let recognizer = recognizer_from_config(&config.ocr)?;

        Ok(Self::new(rasterizer, recognizer)
            .with_language(config.ocr.language.clone())
            .with_jobs(config.ocr.jobs))
    }
}

impl<R: Rasterizer, T: TextRecognizer> DocumentProcessor<R, T> {
    /// Create a sequential processor recognizing Portuguese text.
    pub fn new(rasterizer: R, recognizer: T) -> Self {
        Self {
            rasterizer,
            recognizer,
            parser: RowParser::new(),
            language: "por".to_string(),
            jobs: 1,
        }
    }

    /// Set the recognition language.
    pub fn with_language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }

    /// Set the number of pages recognized in parallel (at least 1).
    pub fn with_jobs(mut self, jobs: usize) -> Self {
        self.jobs = jobs.max(1);
        self
    }

    /// Extract table rows from the document at `path`.
    pub fn process(&self, path: &Path) -> Result<Extraction> {
        self.process_with_progress(path, |_| {})
    }

    /// Extract table rows, reporting progress through `on_event`.
    ///
    /// `on_event` may be called from worker threads.
    pub fn process_with_progress<F>(&self, path: &Path, on_event: F) -> Result<Extraction>
    where
        F: Fn(PageEvent) + Sync,
    {
        let start = Instant::now();

        if !path.exists() {
            return Err(InvtabError::InputMissing(path.to_path_buf()));
        }

        info!("Processing file: {}", path.display());

        let pages = self.rasterizer.rasterize(path)?;
        debug!("Rasterized {} pages", pages.len());
        on_event(PageEvent::Rasterized { pages: pages.len() });

        let texts = self.recognize_pages(&pages, &on_event);

        let mut collector = RowCollector::new();
        for (page, text) in pages.iter().zip(texts) {
            match text {
                Some(Ok(text)) => {
                    let (summary, rows) = self.parser.parse_page(page.number, &text);
                    collector.push_page(summary, rows);
                }
                Some(Err(e)) => return Err(e.into()),
                // Only pages after a failed one are left unrecognized.
                None => {}
            }
        }

        let (rows, summaries) = collector.finish()?;

        info!(
            "Extracted {} rows from {} pages in {:?}",
            rows.len(),
            summaries.len(),
            start.elapsed()
        );

        Ok(Extraction {
            source: path.to_path_buf(),
            rows,
            pages: summaries,
        })
    }

    /// Recognize every page once. Slot `i` holds the text of `pages[i]`.
    ///
    /// After the first failure no further pages are started; pages never
    /// started stay `None`.
    fn recognize_pages<F>(&self, pages: &[PageImage], on_event: &F) -> Vec<Option<ocr::Result<String>>>
    where
        F: Fn(PageEvent) + Sync,
    {
        let total = pages.len();
        let recognize = |page: &PageImage| {
            debug!("Recognizing page {}/{}", page.number, total);
            let result = self.recognizer.recognize(&page.image, &self.language);
            if result.is_ok() {
                on_event(PageEvent::Recognized { page: page.number, total });
            }
            result
        };

        let mut slots: Vec<Option<ocr::Result<String>>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        if self.jobs == 1 || total <= 1 {
            for (slot, page) in slots.iter_mut().zip(pages) {
                let result = recognize(page);
                let failed = result.is_err();
                *slot = Some(result);
                if failed {
                    break;
                }
            }
            return slots;
        }

        let next = AtomicUsize::new(0);
        let failed = AtomicBool::new(false);
        let workers = self.jobs.min(total);

        let finished: Vec<(usize, ocr::Result<String>)> = std::thread::scope(|scope| {
            let handles: Vec<_> = (0..workers)
                .map(|_| {
                    scope.spawn(|| {
                        let mut done = Vec::new();
                        while !failed.load(Ordering::SeqCst) {
                            let i = next.fetch_add(1, Ordering::SeqCst);
                            let Some(page) = pages.get(i) else { break };
                            let result = recognize(page);
                            if result.is_err() {
                                failed.store(true, Ordering::SeqCst);
                            }
                            done.push((i, result));
                        }
                        done
                    })
                })
                .collect();

            handles
                .into_iter()
                .flat_map(|h| match h.join() {
                    Ok(done) => done,
                    Err(panic) => std::panic::resume_unwind(panic),
                })
                .collect()
        });

        for (i, result) in finished {
            slots[i] = Some(result);
        }
        slots
    }
}

/// Run `processor` on `input` and write the rows beside it.
///
/// The CSV goes to `<stem><suffix>.csv` in the input's directory.
pub fn extract_to_csv<R, T>(
    processor: &DocumentProcessor<R, T>,
    input: &Path,
    suffix: &str,
) -> Result<(PathBuf, Extraction)>
where
    R: Rasterizer,
    T: TextRecognizer,
{
    let output = output_path_for(input, suffix)?;
    let extraction = extract_to_file(processor, input, &output, |_| {})?;
    Ok((output, extraction))
}

/// Run `processor` on `input` and write the rows to `output`.
///
/// The file is written only after a successful extraction; on any failure,
/// including [`ExtractionError::NoRows`](crate::error::ExtractionError::NoRows),
/// `output` is left untouched.
pub fn extract_to_file<R, T, F>(
    processor: &DocumentProcessor<R, T>,
    input: &Path,
    output: &Path,
    on_event: F,
) -> Result<Extraction>
where
    R: Rasterizer,
    T: TextRecognizer,
    F: Fn(PageEvent) + Sync,
{
    let extraction = processor.process_with_progress(input, on_event)?;
    write_table(&extraction.rows, output)?;
    Ok(extraction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ExtractionError, OcrError, PdfError};
    use image::{DynamicImage, GenericImageView};
    use pretty_assertions::assert_eq;
    use std::collections::HashMap;
    use std::sync::Mutex;
    use std::time::Duration;

    /// Produces `pages` blank images whose width encodes the page number.
    struct FakeRasterizer {
        pages: u32,
    }

    impl Rasterizer for FakeRasterizer {
        fn rasterize(&self, _path: &Path) -> crate::pdf::Result<Vec<PageImage>> {
            Ok((1..=self.pages)
                .map(|number| PageImage {
                    number,
                    image: DynamicImage::new_luma8(number, 1),
                })
                .collect())
        }
    }

    struct FailingRasterizer;

    impl Rasterizer for FailingRasterizer {
        fn rasterize(&self, _path: &Path) -> crate::pdf::Result<Vec<PageImage>> {
            Err(PdfError::Backend("pdftoppm not found".to_string()))
        }
    }

    /// Returns canned text per page (keyed by image width), sleeping longer
    /// on earlier pages so parallel runs complete out of order.
    struct FakeRecognizer {
        texts: HashMap<u32, String>,
        fail_on: Option<u32>,
        delay: bool,
        calls: Mutex<Vec<(u32, String)>>,
    }

    impl FakeRecognizer {
        fn new(texts: &[(u32, &str)]) -> Self {
            Self {
                texts: texts.iter().map(|(p, t)| (*p, t.to_string())).collect(),
                fail_on: None,
                delay: false,
                calls: Mutex::new(Vec::new()),
            }
        }
    }

    impl TextRecognizer for FakeRecognizer {
        fn recognize(&self, image: &DynamicImage, language: &str) -> ocr::Result<String> {
            let page = image.dimensions().0;
            self.calls.lock().unwrap().push((page, language.to_string()));
            if self.delay {
                std::thread::sleep(Duration::from_millis(u64::from(10 * (6 - page.min(5)))));
            }
            if self.fail_on == Some(page) {
                return Err(OcrError::Recognition("Failed loading language 'por'".to_string()));
            }
            Ok(self.texts.get(&page).cloned().unwrap_or_default())
        }
    }

    fn existing_input() -> tempfile::NamedTempFile {
        tempfile::Builder::new().suffix(".pdf").tempfile().unwrap()
    }

    const PAGE_1: &str = "INVOICE 123\n01 Alpha 1234.56.78 PC 1 1 1 1\n02 Beta 1234.56.78 PC 2 2 2 2\nPage 1/2";
    const PAGE_2: &str = "Item Description NCM\n03 Gamma 1234.56.78 PC 3 3 3 3\n";

    fn items(extraction: &Extraction) -> Vec<&str> {
        extraction.rows.iter().map(|r| r.item.as_str()).collect()
    }

    #[test]
    fn test_rows_in_document_order() {
        let input = existing_input();
        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 2 },
            FakeRecognizer::new(&[(1, PAGE_1), (2, PAGE_2)]),
        );

        let extraction = processor.process(input.path()).unwrap();
        assert_eq!(items(&extraction), vec!["01", "02", "03"]);
        assert_eq!(extraction.pages.len(), 2);
        assert_eq!(extraction.pages[0].rows, 2);
        assert_eq!(extraction.pages[0].lines, 4);
        assert_eq!(extraction.total_lines(), 6);
    }

    #[test]
    fn test_parallel_keeps_document_order() {
        let input = existing_input();
        let mut recognizer = FakeRecognizer::new(&[
            (1, "01 A 1234.56.78 PC 1 1 1 1"),
            (2, "02 B 1234.56.78 PC 1 1 1 1"),
            (3, ""),
            (4, "04 D 1234.56.78 PC 1 1 1 1\n05 E 1234.56.78 PC 1 1 1 1"),
            (5, "06 F 1234.56.78 PC 1 1 1 1"),
        ]);
        recognizer.delay = true;

        let processor = DocumentProcessor::new(FakeRasterizer { pages: 5 }, recognizer).with_jobs(4);
        let extraction = processor.process(input.path()).unwrap();

        assert_eq!(items(&extraction), vec!["01", "02", "04", "05", "06"]);
        assert_eq!(
            extraction.pages.iter().map(|p| p.number).collect::<Vec<_>>(),
            vec![1, 2, 3, 4, 5]
        );
    }

    #[test]
    fn test_each_page_recognized_once_with_language() {
        let input = existing_input();
        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 3 },
            FakeRecognizer::new(&[(1, PAGE_1)]),
        )
        .with_language("eng")
        .with_jobs(2);

        processor.process(input.path()).unwrap();

        let mut calls = processor.recognizer.calls.lock().unwrap().clone();
        calls.sort();
        assert_eq!(
            calls,
            vec![(1, "eng".to_string()), (2, "eng".to_string()), (3, "eng".to_string())]
        );
    }

    #[test]
    fn test_missing_input() {
        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 1 },
            FakeRecognizer::new(&[(1, PAGE_1)]),
        );

        let err = processor.process(Path::new("/nonexistent/invoice.pdf")).unwrap_err();
        assert!(matches!(err, InvtabError::InputMissing(p) if p == Path::new("/nonexistent/invoice.pdf")));
    }

    #[test]
    fn test_no_matching_lines_is_no_rows() {
        let input = existing_input();
        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 2 },
            FakeRecognizer::new(&[(1, "COMMERCIAL INVOICE"), (2, "TOTAL 100,00")]),
        );

        let err = processor.process(input.path()).unwrap_err();
        assert!(matches!(err, InvtabError::Extraction(ExtractionError::NoRows)));
    }

    #[test]
    fn test_rasterizer_failure_propagates() {
        let input = existing_input();
        let processor = DocumentProcessor::new(FailingRasterizer, FakeRecognizer::new(&[]));

        let err = processor.process(input.path()).unwrap_err();
        assert!(matches!(err, InvtabError::Pdf(PdfError::Backend(_))));
        assert!(processor.recognizer.calls.lock().unwrap().is_empty());
    }

    #[test]
    fn test_recognizer_failure_stops_sequential_run() {
        let input = existing_input();
        let mut recognizer = FakeRecognizer::new(&[(1, PAGE_1), (3, PAGE_2)]);
        recognizer.fail_on = Some(2);

        let processor = DocumentProcessor::new(FakeRasterizer { pages: 3 }, recognizer);
        let err = processor.process(input.path()).unwrap_err();

        assert!(matches!(err, InvtabError::Ocr(OcrError::Recognition(_))));
        let pages: Vec<u32> = processor.recognizer.calls.lock().unwrap().iter().map(|c| c.0).collect();
        assert_eq!(pages, vec![1, 2]);
    }

    #[test]
    fn test_recognizer_failure_parallel() {
        let input = existing_input();
        let mut recognizer = FakeRecognizer::new(&[(1, PAGE_1), (2, PAGE_2)]);
        recognizer.fail_on = Some(3);

        let processor = DocumentProcessor::new(FakeRasterizer { pages: 4 }, recognizer).with_jobs(3);
        let err = processor.process(input.path()).unwrap_err();
        assert!(matches!(err, InvtabError::Ocr(_)));
    }

    #[test]
    fn test_progress_events() {
        let input = existing_input();
        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 2 },
            FakeRecognizer::new(&[(1, PAGE_1), (2, PAGE_2)]),
        );

        let events = Mutex::new(Vec::new());
        processor
            .process_with_progress(input.path(), |e| events.lock().unwrap().push(e))
            .unwrap();

        assert_eq!(
            events.into_inner().unwrap(),
            vec![
                PageEvent::Rasterized { pages: 2 },
                PageEvent::Recognized { page: 1, total: 2 },
                PageEvent::Recognized { page: 2, total: 2 },
            ]
        );
    }

    #[test]
    fn test_extract_to_csv_end_to_end() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fatura.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();

        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 2 },
            FakeRecognizer::new(&[(1, PAGE_1), (2, PAGE_2)]),
        );

        let (output, extraction) = extract_to_csv(&processor, &input, "_ocr_result").unwrap();
        assert_eq!(output, dir.path().join("fatura_ocr_result.csv"));
        assert_eq!(extraction.rows.len(), 3);

        let content = std::fs::read_to_string(&output).unwrap();
        assert_eq!(
            content,
            "Item,DISCRIPTION,NCM,Unit,Quantity,R1,R2,Amount\n\
             01,Alpha,1234.56.78,PC,1,1,1,1\n\
             02,Beta,1234.56.78,PC,2,2,2,2\n\
             03,Gamma,1234.56.78,PC,3,3,3,3\n"
        );
    }

    #[test]
    fn test_extract_to_file_custom_output_with_progress() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fatura.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();
        let output = dir.path().join("tables").join("march.csv");
        std::fs::create_dir(output.parent().unwrap()).unwrap();

        let processor = DocumentProcessor::new(
            FakeRasterizer { pages: 2 },
            FakeRecognizer::new(&[(1, PAGE_1), (2, PAGE_2)]),
        );

        let events = Mutex::new(Vec::new());
        let extraction = extract_to_file(&processor, &input, &output, |e| {
            events.lock().unwrap().push(e)
        })
        .unwrap();

        assert_eq!(items(&extraction), vec!["01", "02", "03"]);
        assert_eq!(events.into_inner().unwrap().len(), 3);
        assert!(std::fs::read_to_string(&output)
            .unwrap()
            .starts_with("Item,DISCRIPTION,NCM,Unit,Quantity,R1,R2,Amount\n01,Alpha,"));
        assert!(!dir.path().join("fatura_ocr_result.csv").exists());
    }

    #[test]
    fn test_extract_to_file_keeps_existing_output_on_failure() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("fatura.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();
        let output = dir.path().join("out.csv");
        std::fs::write(&output, "earlier run").unwrap();

        let processor = DocumentProcessor::new(FailingRasterizer, FakeRecognizer::new(&[]));

        assert!(extract_to_file(&processor, &input, &output, |_| {}).is_err());
        assert_eq!(std::fs::read_to_string(&output).unwrap(), "earlier run");
    }

    #[test]
    fn test_extract_to_csv_writes_nothing_without_rows() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("blank.pdf");
        std::fs::write(&input, b"%PDF-1.4").unwrap();

        let processor = DocumentProcessor::new(FakeRasterizer { pages: 1 }, FakeRecognizer::new(&[]));

        assert!(extract_to_csv(&processor, &input, "_ocr_result").is_err());
        assert!(!dir.path().join("blank_ocr_result.csv").exists());
    }
}
