use crate::error::ExportError;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct GridParams {
	pub pos_x: u32,
	pub pos_y: u32,
	pub size_x: u32,
	pub size_y: u32,
	pub gap_x: u32,
	pub gap_y: u32,
	pub num_x: u32,
	pub num_y: u32,
}

impl Default for GridParams {
	fn default() -> GridParams {
		GridParams {
			pos_x: 0,
			pos_y: 0,
			size_x: 0,
			size_y: 0,
			gap_x: 0,
			gap_y: 0,
			num_x: 1,
			num_y: 1,
		}
	}
}

impl GridParams {
	pub fn is_whole_image(&self) -> bool {
		self.size_x == 0 || self.size_y == 0
	}

	/// Grid actually scanned over an image of the given size.
	pub fn effective(&self, image_width: u32, image_height: u32) -> GridParams {
		if self.is_whole_image() {
			return GridParams {
				pos_x: 0,
				pos_y: 0,
				size_x: image_width,
				size_y: image_height,
				gap_x: 0,
				gap_y: 0,
				num_x: 1,
				num_y: 1,
			};
		}
		*self
	}

	pub fn block_count(&self) -> usize {
		(self.num_x * self.num_y) as usize
	}
}


#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct BlockRect {
	pub index: usize,
	pub x: u32,
	pub y: u32,
	pub width: u32,
	pub height: u32,
}


/// Block rectangles in row-major order: every column of a row before the
/// next row.
pub fn blocks(grid: &GridParams, image_width: u32, image_height: u32) -> Vec<BlockRect> {
	let grid: GridParams = grid.effective(image_width, image_height);
	let mut rects: Vec<BlockRect> = Vec::with_capacity(grid.block_count());

	for row in 0..grid.num_y {
		for column in 0..grid.num_x {
			rects.push(BlockRect {
				index: rects.len(),
				x: grid.pos_x + column * (grid.size_x + grid.gap_x),
				y: grid.pos_y + row * (grid.size_y + grid.gap_y),
				width: grid.size_x,
				height: grid.size_y,
			});
		}
	}

	rects
}


/// Fails on the first rectangle reaching past the image.
pub fn check_bounds(rects: &[BlockRect], image_width: u32, image_height: u32) -> Result<(), ExportError> {
	for rect in rects {
		if rect.x + rect.width > image_width || rect.y + rect.height > image_height {
			return Err(ExportError::BlockOutOfBounds {
				index: rect.index,
				x: rect.x,
				y: rect.y,
				width: rect.width,
				height: rect.height,
				image_width,
				image_height,
			});
		}
	}

	Ok(())
}
