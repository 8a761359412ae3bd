use std::collections::BTreeMap;

use crate::{
    classifier::ClassifierRegistry,
    error::ClassifyResult,
    prediction::ClassificationResult,
    storage::StoredImage,
};

/// Run every registered classifier, in order, against one stored image.
///
/// Fail-fast: the first classifier error is returned and the remaining
/// classifiers are not invoked. Blocks for the duration of inference.
pub fn aggregate(
    registry: &ClassifierRegistry,
    image: &StoredImage,
) -> ClassifyResult<ClassificationResult> {
    let mut predictions = BTreeMap::new();
    for classifier in registry.iter() {
        log::info!("Running {} prediction on {}", classifier.name(), image.file_name);
        let set = classifier.classify(&image.path)?;
        log::info!("{} prediction complete", classifier.name());
        predictions.insert(classifier.name().to_string(), set);
    }
    log::info!("Classification complete for {}", image.file_name);
    Ok(ClassificationResult {
        predictions,
        image_url: image.url(),
    })
}

#[cfg(test)]
mod tests {
    use std::{
        path::{Path, PathBuf},
        sync::{
            Arc,
            atomic::{AtomicUsize, Ordering},
        },
    };

    use super::*;
    use crate::{
        classifier::ImageClassifier,
        error::ClassifyError,
        prediction::{Prediction, PredictionSet},
    };

    struct Fixed {
        name: &'static str,
        fail: bool,
        calls: Arc<AtomicUsize>,
    }

    impl ImageClassifier for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn classify(&self, _image_path: &Path) -> ClassifyResult<PredictionSet> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if self.fail {
                return Err(ClassifyError::inference("cannot identify image file"));
            }
            PredictionSet::new(
                [0.4, 0.3, 0.15, 0.1, 0.05]
                    .iter()
                    .enumerate()
                    .map(|(i, c)| Prediction::new(format!("{}_{}", self.name, i), *c))
                    .collect(),
            )
        }
    }

    fn fixed(name: &'static str, fail: bool, calls: &Arc<AtomicUsize>) -> Arc<dyn ImageClassifier> {
        Arc::new(Fixed {
            name,
            fail,
            calls: calls.clone(),
        })
    }

    fn image() -> StoredImage {
        StoredImage {
            file_name: "0b7e5a4c-0000-4000-8000-000000000000.jpg".to_string(),
            path: PathBuf::from("/nonexistent.jpg"),
        }
    }

    #[test]
    fn test_merges_all_classifiers() {
        let calls = Arc::new(AtomicUsize::new(0));
        let registry = ClassifierRegistry::new(vec![
            fixed("tensorflow", false, &calls),
            fixed("pytorch", false, &calls),
        ])
        .unwrap();

        let result = aggregate(&registry, &image()).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert_eq!(result.predictions.len(), 2);
        assert_eq!(result.predictions["pytorch"].top().label, "pytorch_0");
        assert_eq!(
            result.image_url,
            "/uploads/0b7e5a4c-0000-4000-8000-000000000000.jpg"
        );
    }

    #[test]
    fn test_fails_fast() {
        let first = Arc::new(AtomicUsize::new(0));
        let second = Arc::new(AtomicUsize::new(0));
        let registry = ClassifierRegistry::new(vec![
            fixed("tensorflow", true, &first),
            fixed("pytorch", false, &second),
        ])
        .unwrap();

        let err = aggregate(&registry, &image()).unwrap_err();
        assert!(matches!(err, ClassifyError::Inference(_)));
        assert_eq!(first.load(Ordering::SeqCst), 1);
        assert_eq!(second.load(Ordering::SeqCst), 0);
    }
}
