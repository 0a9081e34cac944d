// Quality tier -> yt-dlp format selector mapping.
//
// Every tier prefers H.264 video + AAC audio in an MP4 container for playback
// compatibility, with ordered fallbacks down to "best". The selector strings
// are part of the download contract and must not drift.

use super::models::{PostProcessor, QualityTier};

/// Container forced onto merged output for all video tiers.
pub const MERGE_CONTAINER: &str = "mp4";

/// Target bitrate for extracted audio.
pub const AUDIO_BITRATE: &str = "192";

/// Codec for extracted audio.
pub const AUDIO_CODEC: &str = "mp3";

/// Format selector expression for a quality tier.
pub fn format_for(tier: QualityTier) -> &'static str {
    match tier {
        QualityTier::Best => {
            "bestvideo[vcodec^=avc1][ext=mp4]+bestaudio[acodec^=mp4a][ext=m4a]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        }
        QualityTier::High1080 => {
            "bestvideo[height<=1080][vcodec^=avc1][ext=mp4]+bestaudio[acodec^=mp4a][ext=m4a]/bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best"
        }
        QualityTier::High720 => {
            "bestvideo[height<=720][vcodec^=avc1][ext=mp4]+bestaudio[acodec^=mp4a][ext=m4a]/bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best"
        }
        QualityTier::AudioOnly => "bestaudio[acodec^=mp4a]/bestaudio/best",
    }
}

/// Merge container for a tier, when one is forced.
pub fn merge_container_for(tier: QualityTier) -> Option<&'static str> {
    if tier.is_audio() {
        None
    } else {
        Some(MERGE_CONTAINER)
    }
}

/// Post-processing chain for a tier: video tiers get a container/codec
/// normalization step, the audio tier gets extraction + lossy encode.
pub fn postprocessors_for(tier: QualityTier) -> Vec<PostProcessor> {
    if tier.is_audio() {
        vec![PostProcessor::ExtractAudio {
            codec: AUDIO_CODEC.to_string(),
            bitrate: AUDIO_BITRATE.to_string(),
        }]
    } else {
        vec![PostProcessor::ConvertVideo {
            container: MERGE_CONTAINER.to_string(),
        }]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn selector_strings_are_stable() {
        assert_eq!(
            format_for(QualityTier::Best),
            "bestvideo[vcodec^=avc1][ext=mp4]+bestaudio[acodec^=mp4a][ext=m4a]/bestvideo[ext=mp4]+bestaudio[ext=m4a]/best[ext=mp4]/best"
        );
        assert_eq!(
            format_for(QualityTier::High1080),
            "bestvideo[height<=1080][vcodec^=avc1][ext=mp4]+bestaudio[acodec^=mp4a][ext=m4a]/bestvideo[height<=1080][ext=mp4]+bestaudio[ext=m4a]/best[height<=1080][ext=mp4]/best"
        );
        assert_eq!(
            format_for(QualityTier::High720),
            "bestvideo[height<=720][vcodec^=avc1][ext=mp4]+bestaudio[acodec^=mp4a][ext=m4a]/bestvideo[height<=720][ext=mp4]+bestaudio[ext=m4a]/best[height<=720][ext=mp4]/best"
        );
        assert_eq!(
            format_for(QualityTier::AudioOnly),
            "bestaudio[acodec^=mp4a]/bestaudio/best"
        );
    }

    #[test]
    fn capped_tiers_carry_height_filters() {
        assert!(format_for(QualityTier::High1080).contains("height<=1080"));
        assert!(format_for(QualityTier::High720).contains("height<=720"));
        assert!(!format_for(QualityTier::Best).contains("height<="));
    }

    #[test]
    fn video_tiers_force_mp4_merge() {
        assert_eq!(merge_container_for(QualityTier::Best), Some("mp4"));
        assert_eq!(merge_container_for(QualityTier::High1080), Some("mp4"));
        assert_eq!(merge_container_for(QualityTier::High720), Some("mp4"));
        assert_eq!(merge_container_for(QualityTier::AudioOnly), None);
    }

    #[test]
    fn postprocessor_chain_per_tier() {
        assert_eq!(
            postprocessors_for(QualityTier::High720),
            vec![PostProcessor::ConvertVideo {
                container: "mp4".to_string()
            }]
        );
        assert_eq!(
            postprocessors_for(QualityTier::AudioOnly),
            vec![PostProcessor::ExtractAudio {
                codec: "mp3".to_string(),
                bitrate: "192".to_string()
            }]
        );
    }
}
