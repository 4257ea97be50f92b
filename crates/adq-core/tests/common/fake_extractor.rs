//! A POSIX shell script that imitates the extractor's output contract.
//!
//! Behavior is chosen by the URL:
//! - `*fail*`   writes an error to stderr and exits 1
//! - `*flaky*`  fails the first time, succeeds afterwards
//! - `*hang0*`  blocks until SIGTERM, then exits 0
//! - `*hang1*`  blocks until SIGTERM, then exits 3
//! - `*warn*`   writes a path-like warning to stderr, progress to stdout,
//!   exits 0 without printing a final path
//! - `*pgid*`   records `<pid> <process group>` in `pgid` (Linux `/proc`),
//!   then behaves like the default
//! - anything else prints progress and the final path, exits 0
//!
//! Each run appends its URL to `order.log` in the output directory once
//! signal handling is in place.

use std::path::{Path, PathBuf};
use std::sync::OnceLock;

pub const ORDER_LOG: &str = "order.log";
pub const TRACK_NAME: &str = "track.mp3";

const SCRIPT: &str = r#"#!/bin/sh
url="$1"
out=""
prev=""
for a in "$@"; do
  if [ "$prev" = "--paths" ]; then out="$a"; fi
  prev="$a"
done
case "$url" in
  *hang0*) trap 'exit 0' TERM ;;
  *hang1*) trap 'exit 3' TERM ;;
esac
echo "$url" >> "$out/order.log"
case "$url" in
  *pgid*) echo "$$ $(cut -d' ' -f5 /proc/$$/stat)" > "$out/pgid" ;;
esac
case "$url" in
  *hang*)
    echo "[download]   5.0% of 3.00MiB at 1.00MiB/s ETA 00:03"
    sleep 30 >/dev/null 2>&1 &
    wait $!
    exit 0 ;;
  *fail*)
    echo "[youtube] abc: Downloading webpage"
    echo "ERROR: unsupported URL: $url" >&2
    exit 1 ;;
  *warn*)
    echo "/usr/lib/python3/dist-packages/yt_dlp/utils.py:1: DeprecationWarning: old api" >&2
    echo "[download] 100.0% of 1.00MiB at 1.00MiB/s ETA 00:00"
    exit 0 ;;
  *flaky*)
    if [ ! -f "$out/flaky.seen" ]; then
      touch "$out/flaky.seen"
      echo "[download]  37.0% of 2.00MiB at 1.00MiB/s ETA 00:02"
      echo "ERROR: transient failure" >&2
      exit 2
    fi ;;
esac
echo "[youtube] abc: Downloading webpage"
sleep 0.2
echo "[download]  10.0% of 1.00MiB at 100.00KiB/s ETA 00:09"
echo "[download] 100.0% of 1.00MiB at 1.00MiB/s ETA 00:00"
echo "[ExtractAudio] Destination: $out/track.mp3"
printf '%s' "$out/track.mp3"
exit 0
"#;

/// Path to the script, written once per test binary.
///
/// Every test calls this before spawning anything, so no forked child can
/// hold the script open for writing when it is executed (ETXTBSY).
#[cfg(unix)]
pub fn install() -> PathBuf {
    use std::os::unix::fs::PermissionsExt;

    static DIR: OnceLock<tempfile::TempDir> = OnceLock::new();
    let dir = DIR.get_or_init(|| {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fake-extractor.sh");
        std::fs::write(&path, SCRIPT).unwrap();
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir
    });
    dir.path().join("fake-extractor.sh")
}

pub fn read_order(out: &Path) -> Vec<String> {
    std::fs::read_to_string(out.join(ORDER_LOG))
        .unwrap_or_default()
        .lines()
        .map(str::to_string)
        .collect()
}
