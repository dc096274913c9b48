use crate::{
	emitter::{TableEmitter, TableKind},
	error::ExportError,
	shared_types::{Depth, Scheme},
};

const BLOAD_MAGIC: u8 = 0xFE;

/// Leading table describing how the data table was encoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BinHeader {
	pub size_x: u16,
	pub size_y: u16,
	pub num_x: u16,
	pub num_y: u16,
	pub bpc: u8,
	pub compressor: u8,
	pub skip_empty: bool,
}


impl BinHeader {
	pub fn new(size_x: u32, size_y: u32, num_x: u32, num_y: u32, depth: Depth, scheme: Scheme, skip_empty: bool) -> BinHeader {
		BinHeader {
			size_x: size_x as u16,
			size_y: size_y as u16,
			num_x: num_x as u16,
			num_y: num_y as u16,
			bpc: depth.bits(),
			compressor: scheme.id(),
			skip_empty,
		}
	}

	pub fn write(&self, name: &str, out: &mut dyn TableEmitter) {
		let compressor: &str = Scheme::from_id(self.compressor).map_or("Unknown", Scheme::short_name);

		out.begin_table(TableKind::U8, &format!("{}_header", name), "Header table");
		out.write_words(&[self.size_x, self.size_y], "Block size X/Y");
		out.write_words(&[self.num_x, self.num_y], "Block count X/Y");
		out.write_bytes(&[self.bpc], "Bits per color");
		out.write_bytes(&[self.compressor], &format!("Compressor: {}", compressor));
		out.write_bytes(&[self.skip_empty as u8], "Skip empty");
		out.end_table("");
	}
}


/// Disk BASIC `BLOAD` prefix: magic byte then start, end and execution
/// addresses. Execution starts at the load address.
pub fn bload_header(start: u16, size: usize) -> Result<[u8; 7], ExportError> {
	let last: usize = start as usize + size.saturating_sub(1);
	if last > u16::MAX as usize {
		return Err(ExportError::BloadTooLarge { start, size });
	}

	let [start_lo, start_hi] = start.to_le_bytes();
	let [end_lo, end_hi] = (last as u16).to_le_bytes();

	Ok([BLOAD_MAGIC, start_lo, start_hi, end_lo, end_hi, start_lo, start_hi])
}


#[cfg(test)]
mod tests {
	use super::*;
	use crate::emitter::{BinarySink, TextSink};
	use crate::shared_types::{CropClass, DataFormat, OutputFormat};

	#[test]
	fn binary_header_layout() {
		let header: BinHeader = BinHeader::new(16, 12, 8, 2, Depth::Four, Scheme::CropLine(CropClass::C16), true);
		let mut sink: BinarySink = BinarySink::default();
		header.write("g_Sprite", &mut sink);

		assert_eq!(sink.bytes(), &[16, 0, 12, 0, 8, 0, 2, 0, 4, 0x03, 1]);
		assert_eq!(sink.total_bytes(), 11);
	}

	#[test]
	fn text_header_matches_binary_bytes() {
		let header: BinHeader = BinHeader::new(256, 12, 8, 2, Depth::Four, Scheme::CropLine(CropClass::C16), true);
		let mut text: TextSink = TextSink::new(OutputFormat::C, DataFormat::Hexa, false);
		let mut binary: BinarySink = BinarySink::default();
		header.write("g_Sprite", &mut text);
		header.write("g_Sprite", &mut binary);

		assert!(text.text().contains("const unsigned char g_Sprite_header[] =\n{\n\t0x00, 0x01, 0x0C, 0x00, // Block size X/Y\n"));
		assert!(text.text().contains("\t0x08, 0x00, 0x02, 0x00, // Block count X/Y\n"));
		assert!(!text.text().contains("0x0100"));
		assert_eq!(text.total_bytes(), binary.total_bytes());
	}

	#[test]
	fn bload_addresses() {
		assert_eq!(bload_header(0x4000, 0x100).unwrap(), [0xFE, 0x00, 0x40, 0xFF, 0x40, 0x00, 0x40]);
		assert_eq!(bload_header(0x0000, 0).unwrap(), [0xFE, 0x00, 0x00, 0x00, 0x00, 0x00, 0x00]);
		assert_eq!(bload_header(0xFF00, 0x100).unwrap()[3..5], [0xFF, 0xFF]);
		assert!(matches!(bload_header(0xFF00, 0x101), Err(ExportError::BloadTooLarge { start: 0xFF00, size: 0x101 })));
	}
}
