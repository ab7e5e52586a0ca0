//! Playback sink seam
//!
//! Rendering stops at a [`PcmBuffer`]. Getting it out of a speaker is somebody
//! else's job: an implementation of [`PlaybackSink`] wraps whatever output the
//! host has. [`play`] feeds a sink chunk by chunk and blocks until the sink has
//! taken the whole buffer or the caller cancels.
//!
//! [`WavSink`] writes to a WAV file instead of a device, which is handy for
//! extraction tools and tests.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};

use crate::pcm::{PcmBuffer, SampleFormat};

/// Output stream for rendered PCM
pub trait PlaybackSink {
    /// Open the stream for the given format
    fn open(&mut self, format: SampleFormat, sample_rate: u32, channels: u16) -> Result<()>;

    /// Write one chunk of interleaved PCM; blocks until the sink accepts it
    fn write(&mut self, data: &[u8]) -> Result<()>;

    /// Stop the stream after the last write
    fn stop(&mut self) -> Result<()>;

    /// Release the stream
    fn close(&mut self) -> Result<()>;
}

/// How a call to [`play`] finished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlaybackOutcome {
    /// Every frame was written
    Completed { frames: usize },
    /// Cancelled between chunks
    Cancelled { frames_written: usize },
}

/// Stream a buffer into a sink, `chunk_frames` frames per write
///
/// `cancel` is checked before each write only; a chunk that has started
/// writing always completes.
pub fn play<S: PlaybackSink + ?Sized>(
    sink: &mut S,
    buffer: &PcmBuffer,
    chunk_frames: usize,
    cancel: &AtomicBool,
) -> Result<PlaybackOutcome> {
    sink.open(buffer.format, buffer.sample_rate, buffer.channels)
        .context("failed to open playback stream")?;
    tracing::debug!(
        frames = buffer.frames(),
        rate = buffer.sample_rate,
        channels = buffer.channels,
        "playback started"
    );

    let chunk_bytes = buffer.frame_bytes(chunk_frames.max(1));
    let mut frames_written = 0;
    let mut cancelled = false;

    for chunk in buffer.data.chunks(chunk_bytes) {
        if cancel.load(Ordering::Acquire) {
            cancelled = true;
            break;
        }
        sink.write(chunk).context("playback write failed")?;
        frames_written += chunk.len() / buffer.frame_bytes(1);
    }

    sink.stop().context("failed to stop playback stream")?;
    sink.close().context("failed to close playback stream")?;

    if cancelled {
        tracing::debug!(frames_written, "playback cancelled");
        Ok(PlaybackOutcome::Cancelled { frames_written })
    } else {
        Ok(PlaybackOutcome::Completed {
            frames: frames_written,
        })
    }
}

/// Sink that records the stream into a WAV file
pub struct WavSink {
    path: PathBuf,
    format: Option<SampleFormat>,
    writer: Option<hound::WavWriter<std::io::BufWriter<std::fs::File>>>,
}

impl WavSink {
    /// Sink that will create `path` when opened
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            format: None,
            writer: None,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl PlaybackSink for WavSink {
    fn open(&mut self, format: SampleFormat, sample_rate: u32, channels: u16) -> Result<()> {
        let spec = hound::WavSpec {
            channels,
            sample_rate,
            bits_per_sample: format.bits(),
            sample_format: hound::SampleFormat::Int,
        };
        let writer = hound::WavWriter::create(&self.path, spec)
            .with_context(|| format!("failed to create {}", self.path.display()))?;
        self.writer = Some(writer);
        self.format = Some(format);
        Ok(())
    }

    fn write(&mut self, data: &[u8]) -> Result<()> {
        let (Some(writer), Some(format)) = (self.writer.as_mut(), self.format) else {
            anyhow::bail!("WAV sink written before open");
        };

        let samples = data.chunks_exact(format.width());
        match format {
            // hound stores 8-bit WAV as unsigned and takes signed samples
            SampleFormat::U8 => {
                for b in samples {
                    writer.write_sample((b[0] as i16 - 128) as i8)?;
                }
            }
            SampleFormat::I8 => {
                for b in samples {
                    writer.write_sample(b[0] as i8)?;
                }
            }
            SampleFormat::I16Le => {
                for b in samples {
                    writer.write_sample(i16::from_le_bytes([b[0], b[1]]))?;
                }
            }
            SampleFormat::I32Le => {
                for b in samples {
                    writer.write_sample(i32::from_le_bytes([b[0], b[1], b[2], b[3]]))?;
                }
            }
        }
        Ok(())
    }

    fn stop(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.as_mut() {
            writer.flush()?;
        }
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(writer) = self.writer.take() {
            writer.finalize()?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Records every call for inspection
    #[derive(Default)]
    struct RecordingSink {
        opened: Option<(SampleFormat, u32, u16)>,
        writes: Vec<usize>,
        stopped: bool,
        closed: bool,
        cancel_after: Option<(usize, std::sync::Arc<AtomicBool>)>,
    }

    impl PlaybackSink for RecordingSink {
        fn open(&mut self, format: SampleFormat, sample_rate: u32, channels: u16) -> Result<()> {
            self.opened = Some((format, sample_rate, channels));
            Ok(())
        }

        fn write(&mut self, data: &[u8]) -> Result<()> {
            self.writes.push(data.len());
            if let Some((after, flag)) = &self.cancel_after {
                if self.writes.len() == *after {
                    flag.store(true, Ordering::Release);
                }
            }
            Ok(())
        }

        fn stop(&mut self) -> Result<()> {
            self.stopped = true;
            Ok(())
        }

        fn close(&mut self) -> Result<()> {
            self.closed = true;
            Ok(())
        }
    }

    fn buffer(frames: usize) -> PcmBuffer {
        PcmBuffer {
            data: vec![0; frames * 2],
            format: SampleFormat::I16Le,
            sample_rate: 44100,
            channels: 1,
        }
    }

    #[test]
    fn test_play_writes_whole_chunks() {
        let mut sink = RecordingSink::default();
        let cancel = AtomicBool::new(false);
        let outcome = play(&mut sink, &buffer(10), 4, &cancel).unwrap();

        assert_eq!(outcome, PlaybackOutcome::Completed { frames: 10 });
        assert_eq!(sink.opened, Some((SampleFormat::I16Le, 44100, 1)));
        assert_eq!(sink.writes, vec![8, 8, 4]);
        assert!(sink.stopped && sink.closed);
    }

    #[test]
    fn test_cancel_between_chunks() {
        let flag = std::sync::Arc::new(AtomicBool::new(false));
        let mut sink = RecordingSink {
            cancel_after: Some((2, flag.clone())),
            ..Default::default()
        };
        let outcome = play(&mut sink, &buffer(16), 4, &flag).unwrap();

        assert_eq!(outcome, PlaybackOutcome::Cancelled { frames_written: 8 });
        assert_eq!(sink.writes.len(), 2);
        assert!(sink.closed);
    }

    #[test]
    fn test_wav_sink_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("out.wav");
        let pcm = PcmBuffer {
            data: [100i16, -100, 32767, -32768]
                .iter()
                .flat_map(|s| s.to_le_bytes())
                .collect(),
            format: SampleFormat::I16Le,
            sample_rate: 22050,
            channels: 1,
        };

        let mut sink = WavSink::new(&path);
        let cancel = AtomicBool::new(false);
        play(&mut sink, &pcm, 3, &cancel).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        assert_eq!(reader.spec().sample_rate, 22050);
        assert_eq!(reader.spec().bits_per_sample, 16);
        let samples: Vec<i16> = reader.samples::<i16>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![100, -100, 32767, -32768]);
    }

    #[test]
    fn test_wav_sink_unsigned_8bit() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("u8.wav");
        let pcm = PcmBuffer {
            data: vec![0x80, 0xFF, 0x00],
            format: SampleFormat::U8,
            sample_rate: 11025,
            channels: 1,
        };

        let mut sink = WavSink::new(&path);
        play(&mut sink, &pcm, 4096, &AtomicBool::new(false)).unwrap();

        let mut reader = hound::WavReader::open(&path).unwrap();
        let samples: Vec<i8> = reader.samples::<i8>().map(|s| s.unwrap()).collect();
        assert_eq!(samples, vec![0, 127, -128]);
    }

    #[test]
    fn test_wav_sink_requires_open() {
        let mut sink = WavSink::new("unused.wav");
        assert!(sink.write(&[0, 0]).is_err());
    }
}
