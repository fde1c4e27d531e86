//! Local skin-tone heuristic classifier.
//!
//! Cheap, in-process first stage of the moderation cascade: downsample,
//! count pixels matching a fixed colorimetric skin-tone rule, and map the
//! resulting fraction onto a verdict. A pixel counts as skin when either
//! the HSV-range test or the RGB test fires, so false positives are
//! expected; the remote classifier stage vetoes them.
//!
//! Fails open: any internal error yields a valid verdict with zero
//! confidence, never an error to the caller.

use huella_core::models::{ClassificationVerdict, VerdictSource};

/// Pure, side-effect-free classifier with bounded CPU cost. Safe to share
/// across concurrent submissions.
#[derive(Clone, Debug)]
pub struct LocalHeuristicClassifier {
    analysis_max_dimension: u32,
    review_threshold: f32,
    high_risk_threshold: f32,
}

impl LocalHeuristicClassifier {
    pub fn new(analysis_max_dimension: u32, review_threshold: f32, high_risk_threshold: f32) -> Self {
        Self {
            analysis_max_dimension,
            review_threshold,
            high_risk_threshold,
        }
    }

    pub fn from_config(config: &huella_core::Config) -> Self {
        Self::new(
            config.analysis_max_dimension,
            config.skin_review_threshold,
            config.skin_high_risk_threshold,
        )
    }

    /// Classify one image. Same bytes always produce the same verdict.
    ///
    /// CPU-bound; callers on an async runtime should wrap this in
    /// `tokio::task::spawn_blocking`.
    pub fn classify(&self, data: &[u8]) -> ClassificationVerdict {
        match self.analyze(data) {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!(error = %e, "Skin-tone analysis failed, approving by default");
                ClassificationVerdict::fail_open(
                    format!("analysis failed: {}", e),
                    VerdictSource::LocalHeuristic,
                )
            }
        }
    }

    fn analyze(&self, data: &[u8]) -> Result<ClassificationVerdict, anyhow::Error> {
        let img = image::load_from_memory(data)?;

        // Downsample before analysis to bound cost independent of input size
        let (width, height) = (img.width(), img.height());
        let img = if width.max(height) > self.analysis_max_dimension {
            img.thumbnail(self.analysis_max_dimension, self.analysis_max_dimension)
        } else {
            img
        };

        let rgb = img.to_rgb8();
        let total_pixels = (rgb.width() as u64) * (rgb.height() as u64);
        if total_pixels == 0 {
            return Ok(ClassificationVerdict::fail_open(
                "empty pixel set",
                VerdictSource::LocalHeuristic,
            ));
        }

        let skin_pixels = rgb
            .pixels()
            .filter(|p| is_skin_tone(p[0], p[1], p[2]))
            .count() as u64;
        let skin_percentage = (skin_pixels as f32 / total_pixels as f32) * 100.0;

        tracing::debug!(
            skin_percentage = skin_percentage,
            total_pixels = total_pixels,
            "Skin-tone analysis"
        );

        let verdict = if skin_percentage < self.review_threshold {
            ClassificationVerdict::valid(
                "low skin-tone fraction",
                0.8,
                VerdictSource::LocalHeuristic,
            )
        } else if skin_percentage < self.high_risk_threshold {
            ClassificationVerdict::invalid(
                format!(
                    "moderate skin-tone fraction ({:.1}%), requires review",
                    skin_percentage
                ),
                0.5,
                VerdictSource::LocalHeuristic,
            )
        } else {
            ClassificationVerdict::invalid(
                format!("high skin-tone fraction ({:.1}%), high risk", skin_percentage),
                0.7,
                VerdictSource::LocalHeuristic,
            )
        };

        Ok(verdict)
    }
}

/// Fixed colorimetric rule for one pixel. A pixel counts as skin when
/// either the HSV-range test or the RGB test fires.
fn is_skin_tone(r: u8, g: u8, b: u8) -> bool {
    let (h, s, v) = rgb_to_hsv(r, g, b);

    let skin_h = (0.0..=0.15).contains(&h) || (0.95..=1.0).contains(&h);
    let skin_s = (0.15..=0.75).contains(&s);
    let skin_v = (0.35..=0.95).contains(&v);

    let (ri, gi, bi) = (r as i32, g as i32, b as i32);
    let skin_rgb = ri > 60
        && ri < 255
        && gi > 40
        && gi < 255
        && bi > 20
        && bi < 255
        && ri > gi
        && gi > bi
        && (ri - gi) > 15
        && (ri - bi) > 15;

    (skin_h && skin_s && skin_v) || skin_rgb
}

/// RGB to HSV with all channels normalized to [0, 1].
fn rgb_to_hsv(r: u8, g: u8, b: u8) -> (f32, f32, f32) {
    let r = r as f32 / 255.0;
    let g = g as f32 / 255.0;
    let b = b as f32 / 255.0;

    let max = r.max(g).max(b);
    let min = r.min(g).min(b);
    let delta = max - min;

    let v = max;
    let s = if max == 0.0 { 0.0 } else { delta / max };

    let h = if delta == 0.0 {
        0.0
    } else if max == r {
        let mut h = (g - b) / delta / 6.0;
        if h < 0.0 {
            h += 1.0;
        }
        h
    } else if max == g {
        ((b - r) / delta + 2.0) / 6.0
    } else {
        ((r - g) / delta + 4.0) / 6.0
    };

    (h, s, v)
}
