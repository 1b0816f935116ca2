// Container metadata probing for Call Minutes
// Reads the audio duration from the file header; degrades to 0 on any failure

use anyhow::{anyhow, bail, Result};
use std::path::Path;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

/// Duration of an audio file in whole seconds.
///
/// Unsupported containers (amr, 3gp) and unreadable files report 0; the
/// record is still usable, just without a duration.
pub fn probe_duration_seconds(path: &Path) -> i64 {
    match probe(path) {
        Ok(seconds) => seconds,
        Err(e) => {
            log::debug!("Could not probe duration of {}: {}", path.display(), e);
            0
        }
    }
}

fn probe(path: &Path) -> Result<i64> {
    let file = std::fs::File::open(path)?;
    let stream = MediaSourceStream::new(Box::new(file), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = path.extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = symphonia::default::get_probe().format(
        &hint,
        stream,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;

    let track = probed
        .format
        .default_track()
        .ok_or_else(|| anyhow!("no default track"))?;
    let params = &track.codec_params;

    let (time_base, n_frames) = match (params.time_base, params.n_frames) {
        (Some(tb), Some(n)) => (tb, n),
        _ => bail!("container does not declare a duration"),
    };

    let time = time_base.calc_time(n_frames);
    Ok(time.seconds as i64)
}
