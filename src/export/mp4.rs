//! Minimal MP4 muxing for an MJPEG video track
//!
//! Builds a single-track `isom` file: `ftyp`, one `mdat` holding every JPEG
//! sample back to back, and a `moov` whose sample table points into it. All
//! samples share one duration, so the track plays at exactly the configured
//! fps regardless of real capture cadence.

use std::io::{self, Write};

/// Fixed-point 3x3 identity matrix used by `mvhd` and `tkhd`.
const IDENTITY_MATRIX: [u32; 9] = [0x0001_0000, 0, 0, 0, 0x0001_0000, 0, 0, 0, 0x4000_0000];

/// Accumulates JPEG samples and serializes the finished file.
#[derive(Debug)]
pub struct MjpegMp4 {
    width: u32,
    height: u32,
    fps: u32,
    samples: Vec<Vec<u8>>,
}

impl MjpegMp4 {
    /// Start a track with the given (already even) dimensions and frame rate.
    pub fn new(width: u32, height: u32, fps: u32) -> Self {
        Self {
            width,
            height,
            fps: fps.max(1),
            samples: Vec::new(),
        }
    }

    /// Append one JPEG sample. Samples appear in the output in push order.
    pub fn push_sample(&mut self, jpeg: Vec<u8>) {
        self.samples.push(jpeg);
    }

    /// Number of samples appended so far.
    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Ticks per second; 100 ticks per frame keeps durations integral.
    fn timescale(&self) -> u32 {
        self.fps * 100
    }

    /// Track duration in timescale units.
    fn duration(&self) -> u32 {
        self.samples.len() as u32 * 100
    }

    /// Serialize the complete file.
    pub fn finish(self) -> io::Result<Vec<u8>> {
        let ftyp = self.ftyp()?;
        // Sample data begins right after the mdat header.
        let mdat_offset = (ftyp.len() + 8) as u32;

        let mut out = ftyp;
        self.write_mdat(&mut out)?;
        out.extend_from_slice(&boxed(b"moov", &self.moov(mdat_offset)?)?);
        Ok(out)
    }

    fn ftyp(&self) -> io::Result<Vec<u8>> {
        let mut content = Vec::new();
        content.write_all(b"isom")?;
        content.write_all(&512u32.to_be_bytes())?;
        for brand in [b"isom", b"iso2", b"mp41"] {
            content.write_all(brand)?;
        }
        boxed(b"ftyp", &content)
    }

    fn write_mdat(&self, out: &mut Vec<u8>) -> io::Result<()> {
        let data_size: usize = self.samples.iter().map(Vec::len).sum();
        out.write_all(&((8 + data_size) as u32).to_be_bytes())?;
        out.write_all(b"mdat")?;
        for sample in &self.samples {
            out.write_all(sample)?;
        }
        Ok(())
    }

    fn moov(&self, mdat_offset: u32) -> io::Result<Vec<u8>> {
        let mut out = self.mvhd()?;
        out.extend_from_slice(&boxed(b"trak", &self.trak(mdat_offset)?)?);
        Ok(out)
    }

    fn mvhd(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?; // version + flags
        c.write_all(&0u32.to_be_bytes())?; // creation time
        c.write_all(&0u32.to_be_bytes())?; // modification time
        c.write_all(&self.timescale().to_be_bytes())?;
        c.write_all(&self.duration().to_be_bytes())?;
        c.write_all(&0x0001_0000u32.to_be_bytes())?; // rate 1.0
        c.write_all(&[0x01, 0x00])?; // volume 1.0
        c.write_all(&[0u8; 10])?; // reserved
        for val in &IDENTITY_MATRIX {
            c.write_all(&val.to_be_bytes())?;
        }
        c.write_all(&[0u8; 24])?; // pre-defined
        c.write_all(&2u32.to_be_bytes())?; // next track id
        boxed(b"mvhd", &c)
    }

    fn trak(&self, mdat_offset: u32) -> io::Result<Vec<u8>> {
        let mut out = self.tkhd()?;
        out.extend_from_slice(&boxed(b"mdia", &self.mdia(mdat_offset)?)?);
        Ok(out)
    }

    fn tkhd(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 3])?; // version + flags: track enabled
        c.write_all(&0u32.to_be_bytes())?; // creation time
        c.write_all(&0u32.to_be_bytes())?; // modification time
        c.write_all(&1u32.to_be_bytes())?; // track id
        c.write_all(&0u32.to_be_bytes())?; // reserved
        c.write_all(&self.duration().to_be_bytes())?;
        c.write_all(&[0u8; 8])?; // reserved
        c.write_all(&0u16.to_be_bytes())?; // layer
        c.write_all(&0u16.to_be_bytes())?; // alternate group
        c.write_all(&0u16.to_be_bytes())?; // volume (video: 0)
        c.write_all(&0u16.to_be_bytes())?; // reserved
        for val in &IDENTITY_MATRIX {
            c.write_all(&val.to_be_bytes())?;
        }
        c.write_all(&(self.width << 16).to_be_bytes())?; // fixed point
        c.write_all(&(self.height << 16).to_be_bytes())?;
        boxed(b"tkhd", &c)
    }

    fn mdia(&self, mdat_offset: u32) -> io::Result<Vec<u8>> {
        let mut out = self.mdhd()?;
        out.extend_from_slice(&self.hdlr()?);
        out.extend_from_slice(&boxed(b"minf", &self.minf(mdat_offset)?)?);
        Ok(out)
    }

    fn mdhd(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&0u32.to_be_bytes())?;
        c.write_all(&0u32.to_be_bytes())?;
        c.write_all(&self.timescale().to_be_bytes())?;
        c.write_all(&self.duration().to_be_bytes())?;
        c.write_all(&0x55c4u16.to_be_bytes())?; // language: und
        c.write_all(&0u16.to_be_bytes())?;
        boxed(b"mdhd", &c)
    }

    fn hdlr(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&0u32.to_be_bytes())?;
        c.write_all(b"vide")?;
        c.write_all(&[0u8; 12])?;
        c.write_all(b"Replay Video Handler\0")?;
        boxed(b"hdlr", &c)
    }

    fn minf(&self, mdat_offset: u32) -> io::Result<Vec<u8>> {
        let mut out = self.vmhd()?;
        out.extend_from_slice(&self.dinf()?);
        out.extend_from_slice(&boxed(b"stbl", &self.stbl(mdat_offset)?)?);
        Ok(out)
    }

    fn vmhd(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 1])?;
        c.write_all(&0u16.to_be_bytes())?; // graphics mode
        c.write_all(&[0u8; 6])?; // op color
        boxed(b"vmhd", &c)
    }

    fn dinf(&self) -> io::Result<Vec<u8>> {
        let mut dref = Vec::new();
        dref.write_all(&[0, 0, 0, 0])?;
        dref.write_all(&1u32.to_be_bytes())?; // entry count
        dref.write_all(&12u32.to_be_bytes())?; // url entry size
        dref.write_all(b"url ")?;
        dref.write_all(&[0, 0, 0, 1])?; // self-contained
        boxed(b"dinf", &boxed(b"dref", &dref)?)
    }

    fn stbl(&self, mdat_offset: u32) -> io::Result<Vec<u8>> {
        let mut out = self.stsd()?;
        out.extend_from_slice(&self.stts()?);
        out.extend_from_slice(&self.stsc()?);
        out.extend_from_slice(&self.stsz()?);
        out.extend_from_slice(&self.stco(mdat_offset)?);
        Ok(out)
    }

    fn stsd(&self) -> io::Result<Vec<u8>> {
        let mut entry = Vec::new();
        entry.write_all(&[0u8; 6])?; // reserved
        entry.write_all(&1u16.to_be_bytes())?; // data reference index
        entry.write_all(&[0u8; 16])?; // pre-defined + reserved
        entry.write_all(&(self.width as u16).to_be_bytes())?;
        entry.write_all(&(self.height as u16).to_be_bytes())?;
        entry.write_all(&0x0048_0000u32.to_be_bytes())?; // 72 dpi
        entry.write_all(&0x0048_0000u32.to_be_bytes())?;
        entry.write_all(&0u32.to_be_bytes())?; // reserved
        entry.write_all(&1u16.to_be_bytes())?; // frame count per sample

        let mut compressor = [0u8; 32];
        let name = b"Motion JPEG";
        compressor[0] = name.len() as u8;
        compressor[1..1 + name.len()].copy_from_slice(name);
        entry.write_all(&compressor)?;

        entry.write_all(&24u16.to_be_bytes())?; // depth
        entry.write_all(&(-1i16).to_be_bytes())?; // pre-defined

        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&1u32.to_be_bytes())?; // entry count
        c.extend_from_slice(&boxed(b"jpeg", &entry)?);
        boxed(b"stsd", &c)
    }

    fn stts(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&1u32.to_be_bytes())?;
        c.write_all(&(self.samples.len() as u32).to_be_bytes())?;
        c.write_all(&100u32.to_be_bytes())?; // per-sample delta
        boxed(b"stts", &c)
    }

    fn stsc(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&1u32.to_be_bytes())?;
        c.write_all(&1u32.to_be_bytes())?; // first chunk
        c.write_all(&(self.samples.len() as u32).to_be_bytes())?; // one chunk
        c.write_all(&1u32.to_be_bytes())?; // sample description index
        boxed(b"stsc", &c)
    }

    fn stsz(&self) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&0u32.to_be_bytes())?; // variable sizes
        c.write_all(&(self.samples.len() as u32).to_be_bytes())?;
        for sample in &self.samples {
            c.write_all(&(sample.len() as u32).to_be_bytes())?;
        }
        boxed(b"stsz", &c)
    }

    fn stco(&self, mdat_offset: u32) -> io::Result<Vec<u8>> {
        let mut c = Vec::new();
        c.write_all(&[0, 0, 0, 0])?;
        c.write_all(&1u32.to_be_bytes())?;
        c.write_all(&mdat_offset.to_be_bytes())?;
        boxed(b"stco", &c)
    }
}

/// Wrap `content` in a box of the given type.
fn boxed(kind: &[u8; 4], content: &[u8]) -> io::Result<Vec<u8>> {
    let mut out = Vec::with_capacity(8 + content.len());
    out.write_all(&((8 + content.len()) as u32).to_be_bytes())?;
    out.write_all(kind)?;
    out.write_all(content)?;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Scan top-level and nested boxes for the given type.
    pub(crate) fn find_box(data: &[u8], box_type: &[u8; 4]) -> Option<usize> {
        let mut offset = 0;
        while offset + 8 <= data.len() {
            if &data[offset + 4..offset + 8] == box_type {
                return Some(offset);
            }
            offset += 1;
        }
        None
    }

    fn sample_file() -> Vec<u8> {
        let mut mux = MjpegMp4::new(640, 360, 30);
        mux.push_sample(vec![0xFF, 0xD8, 0xFF, 0xD9]);
        mux.push_sample(vec![0xFF, 0xD8, 0x00, 0xFF, 0xD9]);
        mux.finish().unwrap()
    }

    #[test]
    fn test_file_starts_with_ftyp() {
        let data = sample_file();
        assert_eq!(&data[4..8], b"ftyp");
    }

    #[test]
    fn test_required_boxes_present() {
        let data = sample_file();
        for kind in [b"mdat", b"moov", b"mvhd", b"trak", b"stbl", b"stsz"] {
            assert!(find_box(&data, kind).is_some(), "missing box");
        }
    }

    #[test]
    fn test_jpeg_sample_entry() {
        let data = sample_file();
        assert!(find_box(&data, b"jpeg").is_some());
    }

    #[test]
    fn test_chunk_offset_points_at_first_sample() {
        let data = sample_file();
        let stco = find_box(&data, b"stco").unwrap();
        let offset = u32::from_be_bytes([
            data[stco + 16],
            data[stco + 17],
            data[stco + 18],
            data[stco + 19],
        ]) as usize;
        // First sample begins with the JPEG SOI marker.
        assert_eq!(&data[offset..offset + 2], &[0xFF, 0xD8]);
    }

    #[test]
    fn test_sample_count() {
        let mut mux = MjpegMp4::new(16, 16, 30);
        assert_eq!(mux.sample_count(), 0);
        mux.push_sample(vec![1]);
        mux.push_sample(vec![2]);
        assert_eq!(mux.sample_count(), 2);
    }
}
