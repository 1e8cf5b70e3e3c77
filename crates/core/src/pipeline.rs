//! Text normalization pipeline
//!
//! Applies an ordered list of normalizers. `apply` returns only the final
//! text; `process` keeps every intermediate layer so the effect of each
//! normalizer can be inspected on its own.

use crate::normalizers::Normalizer;

/// A single layer of normalized text
#[derive(Debug, Clone)]
pub struct NormalizationLayer {
    /// The normalized text at this layer
    pub text: String,

    /// Metadata about the normalizer that produced this layer
    pub metadata: LayerMetadata,
}

/// Metadata about a normalization layer
#[derive(Debug, Clone, Default)]
pub struct LayerMetadata {
    /// Name of the normalizer that created this layer
    pub normalizer_name: String,

    /// Additional information (e.g., parameters used)
    pub info: Vec<(String, String)>,
}

impl NormalizationLayer {
    /// Length of the text in this layer, in characters
    pub fn len(&self) -> usize {
        self.text.chars().count()
    }

    pub fn is_empty(&self) -> bool {
        self.text.is_empty()
    }
}

/// An ordered pipeline of text normalizers
#[derive(Default, Clone)]
pub struct TextPipeline {
    normalizers: Vec<Box<dyn Normalizer>>,
}

impl TextPipeline {
    /// Create a new empty pipeline
    pub fn new() -> Self {
        Self {
            normalizers: Vec::new(),
        }
    }

    /// Add a normalizer to the pipeline
    pub fn add_normalizer(mut self, normalizer: Box<dyn Normalizer>) -> Self {
        self.normalizers.push(normalizer);
        self
    }

    /// Run the text through every normalizer, returning the final text
    pub fn apply(&self, input: &str) -> String {
        let mut current = input.to_string();
        for normalizer in &self.normalizers {
            current = normalizer.normalize(&current);
        }
        current
    }

    /// Process text through the entire pipeline, returning all layers
    pub fn process(&self, input: &str) -> LayerSet {
        let mut layers = LayerSet::new(input.to_string());
        let mut current_text = input.to_string();

        for normalizer in &self.normalizers {
            let normalized = normalizer.normalize(&current_text);

            layers.add_layer(NormalizationLayer {
                text: normalized.clone(),
                metadata: LayerMetadata {
                    normalizer_name: normalizer.name().to_string(),
                    info: normalizer.metadata(),
                },
            });
            current_text = normalized;
        }

        layers
    }

    /// Get the number of normalizers in the pipeline
    pub fn len(&self) -> usize {
        self.normalizers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.normalizers.is_empty()
    }
}

/// A complete set of normalization layers from original to final
#[derive(Debug, Clone)]
pub struct LayerSet {
    /// The original input text (layer 0)
    original: String,

    /// All normalization layers (layer 1, 2, 3, ...)
    layers: Vec<NormalizationLayer>,
}

impl LayerSet {
    pub fn new(original: String) -> Self {
        Self {
            original,
            layers: Vec::new(),
        }
    }

    pub fn add_layer(&mut self, layer: NormalizationLayer) {
        self.layers.push(layer);
    }

    pub fn original(&self) -> &str {
        &self.original
    }

    /// Get the final (most normalized) layer
    pub fn final_layer(&self) -> &str {
        self.layers
            .last()
            .map(|l| l.text.as_str())
            .unwrap_or(&self.original)
    }

    /// Get the total number of layers (including original)
    pub fn num_layers(&self) -> usize {
        self.layers.len() + 1
    }

    /// Names of the normalizers that actually changed the text
    pub fn changed_by(&self) -> Vec<&str> {
        let mut previous = self.original.as_str();
        let mut changed = Vec::new();
        for layer in &self.layers {
            if layer.text != previous {
                changed.push(layer.metadata.normalizer_name.as_str());
            }
            previous = &layer.text;
        }
        changed
    }
}
