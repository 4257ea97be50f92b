//! Extractor command line for one job.

use std::ffi::OsString;
use std::path::Path;

use crate::job::Job;

/// Output filename template handed to the extractor.
pub const OUTPUT_TEMPLATE: &str = "%(title)s.%(ext)s";

/// Asks the extractor to print the final file path once it is moved into place.
pub const FILEPATH_TRAILER: &str = "after_move:%(filepath)s";

/// Best available audio quality.
const AUDIO_QUALITY: &str = "0";

/// Build the extractor argument vector for `job`, using `encoder` for transcoding.
pub fn build_args(job: &Job, encoder: &Path) -> Vec<OsString> {
    let opts = &job.options;
    let mut args: Vec<OsString> = vec![
        job.url.trim().into(),
        "-x".into(),
        "--audio-format".into(),
        opts.audio_format.as_str().into(),
        "--audio-quality".into(),
        AUDIO_QUALITY.into(),
        "--ffmpeg-location".into(),
        encoder.as_os_str().to_owned(),
        "-o".into(),
        OUTPUT_TEMPLATE.into(),
        "--paths".into(),
        opts.output_dir.as_os_str().to_owned(),
        "--progress".into(),
        "--newline".into(),
    ];

    if opts.embed_metadata {
        args.push("--embed-metadata".into());
    }
    if opts.embed_thumbnail {
        args.push("--embed-thumbnail".into());
    }
    if !opts.allow_playlists {
        args.push("--no-playlist".into());
    }

    args.push("--print".into());
    args.push(FILEPATH_TRAILER.into());
    args
}
