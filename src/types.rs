use std::ops::Range;

/// Next image id and next annotation id to hand out.
///
/// A fresh run starts both at 1; when several files share one id space the
/// seeds returned by one file feed the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IdSeeds {
    pub image: u64,
    pub annotation: u64,
}

impl Default for IdSeeds {
    fn default() -> Self {
        Self {
            image: 1,
            annotation: 1,
        }
    }
}

// Struct to hold what a normalization pass did to one dataset
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NormalizeStats {
    pub image_ids: Range<u64>,
    pub annotation_ids: Range<u64>,
}

impl NormalizeStats {
    pub fn images(&self) -> u64 {
        self.image_ids.end - self.image_ids.start
    }

    pub fn annotations(&self) -> u64 {
        self.annotation_ids.end - self.annotation_ids.start
    }

    /// Seeds that continue the id space after this pass
    pub fn next_seeds(&self) -> IdSeeds {
        IdSeeds {
            image: self.image_ids.end,
            annotation: self.annotation_ids.end,
        }
    }

    pub fn print_summary(&self, label: &str) {
        log::info!("=== {} Summary ===", label);
        log::info!("Images remapped: {}", self.images());
        log::info!("Annotations normalized: {}", self.annotations());
        if self.images() > 0 {
            log::info!(
                "Image ids: {}..={}",
                self.image_ids.start,
                self.image_ids.end - 1
            );
        }
        if self.annotations() > 0 {
            log::info!(
                "Annotation ids: {}..={}",
                self.annotation_ids.start,
                self.annotation_ids.end - 1
            );
        }
    }
}
