use super::ffmpeg::TranscoderSettings;
use crate::stream::MediaSourceConfig;

/// Build the ffmpeg argument list for a source.
///
/// Layout: `-re [-headers "Cookie: <v>"] -i <url> -analyzeduration 0
/// -loglevel 0 -acodec <codec> [-b:a <bitrate>] -f opus pipe:1`
pub fn build_args(source: &MediaSourceConfig, settings: &TranscoderSettings) -> Vec<String> {
    let mut args = vec!["-re".to_string()];

    if let Some(cookie) = source.cookie.as_deref().filter(|c| !c.is_empty()) {
        args.push("-headers".to_string());
        args.push(format!("Cookie: {}", cookie));
    }

    args.push("-i".to_string());
    args.push(source.url.clone());

    args.extend(
        ["-analyzeduration", "0", "-loglevel", "0", "-acodec"]
            .iter()
            .map(|s| s.to_string()),
    );
    args.push(settings.codec.clone());

    if let Some(bitrate) = &settings.bitrate {
        args.push("-b:a".to_string());
        args.push(bitrate.clone());
    }

    args.extend(["-f", "opus", "pipe:1"].iter().map(|s| s.to_string()));
    args
}
