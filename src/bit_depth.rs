use std::io::{self, Cursor};

use bitstream_io::{BigEndian, BitRead, BitReader, BitWrite, BitWriter};

use crate::shared_types::Depth;


/// Packs one code per pixel into bytes, first pixel in the high bits. A
/// trailing partial byte is padded with zero bits.
pub fn pack_codes(codes: &[u8], depth: Depth) -> io::Result<Vec<u8>> {
	if depth == Depth::Eight {
		return Ok(codes.to_vec());
	}

	let bits: u32 = depth.bits() as u32;
	let mask: u8 = ((1u16 << bits) - 1) as u8;
	let mut packed: Vec<u8> = Vec::with_capacity(codes.len() / depth.pixels_per_byte() as usize + 1);
	let mut bit_writer = BitWriter::endian(&mut packed, BigEndian);

	for code in codes {
		bit_writer.write(bits, code & mask)?;
	}

	bit_writer.byte_align()?;
	bit_writer.into_writer();

	Ok(packed)
}


/// Reverse of `pack_codes`, reading `count` codes.
pub fn unpack_codes(bytes: &[u8], depth: Depth, count: usize) -> io::Result<Vec<u8>> {
	if depth == Depth::Eight {
		return Ok(bytes[..count.min(bytes.len())].to_vec());
	}

	let bits: u32 = depth.bits() as u32;
	let mut codes: Vec<u8> = Vec::with_capacity(count);
	let mut bit_reader = BitReader::endian(Cursor::new(bytes), BigEndian);

	for _ in 0..count {
		codes.push(bit_reader.read::<u8>(bits)?);
	}

	Ok(codes)
}


/// Two bit fields sharing one byte, `high` in the upper `high_bits`.
pub fn pack_fields(high: u8, high_bits: u32, low: u8, low_bits: u32) -> io::Result<u8> {
	let mut byte: Vec<u8> = Vec::with_capacity(1);
	let mut bit_writer = BitWriter::endian(&mut byte, BigEndian);

	bit_writer.write(high_bits, high & ((1u16 << high_bits) - 1) as u8)?;
	bit_writer.write(low_bits, low & ((1u16 << low_bits) - 1) as u8)?;
	bit_writer.byte_align()?;
	bit_writer.into_writer();

	Ok(byte[0])
}


/// Splits a byte written by `pack_fields`.
pub fn unpack_fields(byte: u8, high_bits: u32, low_bits: u32) -> io::Result<(u8, u8)> {
	let bytes: [u8; 1] = [byte];
	let mut bit_reader = BitReader::endian(Cursor::new(&bytes[..]), BigEndian);

	let high: u8 = bit_reader.read::<u8>(high_bits)?;
	let low: u8 = bit_reader.read::<u8>(low_bits)?;

	Ok((high, low))
}


#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn four_bit_codes_share_bytes() {
		assert_eq!(pack_codes(&[0x1, 0x2, 0x3], Depth::Four).unwrap(), vec![0x12, 0x30]);
		assert_eq!(unpack_codes(&[0x12, 0x30], Depth::Four, 3).unwrap(), vec![0x1, 0x2, 0x3]);
	}

	#[test]
	fn one_bit_codes_fill_from_the_left() {
		let codes: [u8; 10] = [1, 0, 1, 1, 0, 0, 0, 1, 1, 1];
		assert_eq!(pack_codes(&codes, Depth::One).unwrap(), vec![0b1011_0001, 0b1100_0000]);
	}

	#[test]
	fn two_bit_codes() {
		assert_eq!(pack_codes(&[3, 2, 1, 0, 3], Depth::Two).unwrap(), vec![0b1110_0100, 0b1100_0000]);
	}

	#[test]
	fn header_fields() {
		assert_eq!(pack_fields(0x3, 4, 0xC, 4).unwrap(), 0x3C);
		assert_eq!(pack_fields(7, 3, 31, 5).unwrap(), 0xFF);
		assert_eq!(pack_fields(2, 3, 9, 5).unwrap(), 0b010_01001);
		assert_eq!(unpack_fields(0b010_01001, 3, 5).unwrap(), (2, 9));
	}
}
