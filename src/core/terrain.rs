use super::{Result, StoreError};

/// Square elevation grid of 16-bit signed samples, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerrainMap {
    size: usize,
    heights: Vec<i16>,
}

impl TerrainMap {
    /// Flat grid of `size x size` zero samples.
    pub fn new(size: usize) -> Self {
        Self {
            size,
            heights: vec![0; size * size],
        }
    }

    pub fn from_heights(size: usize, heights: Vec<i16>) -> Result<Self> {
        if heights.len() != size * size {
            return Err(StoreError::InvalidTerrain(format!(
                "expected {} samples for a {}x{} grid, got {}",
                size * size,
                size,
                size,
                heights.len()
            )));
        }
        Ok(Self { size, heights })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn heights(&self) -> &[i16] {
        &self.heights
    }

    pub fn get(&self, x: usize, y: usize) -> Option<i16> {
        if x >= self.size || y >= self.size {
            return None;
        }
        self.heights.get(y * self.size + x).copied()
    }

    pub fn set(&mut self, x: usize, y: usize, height: i16) -> Result<()> {
        if x >= self.size || y >= self.size {
            return Err(StoreError::InvalidTerrain(format!(
                "({}, {}) outside {}x{} grid",
                x, y, self.size, self.size
            )));
        }
        self.heights[y * self.size + x] = height;
        Ok(())
    }

    /// Raw little-endian buffer of `2 * size * size` bytes.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(self.heights.len() * 2);
        for height in &self.heights {
            out.extend_from_slice(&height.to_le_bytes());
        }
        out
    }

    /// Inverse of [`TerrainMap::to_bytes`]; the grid size is inferred from the
    /// buffer length.
    pub fn from_bytes(bytes: &[u8]) -> Result<Self> {
        if bytes.len() % 2 != 0 {
            return Err(StoreError::InvalidTerrain(format!(
                "odd buffer length {}",
                bytes.len()
            )));
        }
        let samples = bytes.len() / 2;
        let size = samples.isqrt();
        if size * size != samples {
            return Err(StoreError::InvalidTerrain(format!(
                "{} samples do not form a square grid",
                samples
            )));
        }
        let heights = bytes
            .chunks_exact(2)
            .map(|pair| i16::from_le_bytes([pair[0], pair[1]]))
            .collect();
        Ok(Self { size, heights })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_four_by_four_buffer() {
        let heights: Vec<i16> = vec![
            0, 1, -1, 300, //
            i16::MIN, i16::MAX, 42, -42, //
            7, 8, 9, 10, //
            -300, 256, -256, 1000,
        ];
        let map = TerrainMap::from_heights(4, heights.clone()).unwrap();
        let bytes = map.to_bytes();
        assert_eq!(bytes.len(), 32);
        assert_eq!(&bytes[6..8], &300i16.to_le_bytes());

        let decoded = TerrainMap::from_bytes(&bytes).unwrap();
        assert_eq!(decoded.size(), 4);
        assert_eq!(decoded.heights(), heights.as_slice());
        assert_eq!(decoded.get(0, 1), Some(i16::MIN));
    }

    #[test]
    fn test_rejects_non_square_buffers() {
        assert!(TerrainMap::from_bytes(&[0u8; 3]).is_err());
        assert!(TerrainMap::from_bytes(&[0u8; 6]).is_err());
        assert!(TerrainMap::from_heights(3, vec![0; 8]).is_err());
    }

    #[test]
    fn test_empty_buffer_is_empty_grid() {
        let map = TerrainMap::from_bytes(&[]).unwrap();
        assert_eq!(map.size(), 0);
    }

    #[test]
    fn test_set_out_of_bounds() {
        let mut map = TerrainMap::new(2);
        map.set(1, 1, 5).unwrap();
        assert_eq!(map.get(1, 1), Some(5));
        assert!(map.set(2, 0, 1).is_err());
        assert_eq!(map.get(0, 2), None);
    }
}
