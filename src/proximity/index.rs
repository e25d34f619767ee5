//! Spatial index for fast buffer candidate lookups.

use geo::Point;
use rstar::{RTree, RTreeObject, AABB};
use tracing::debug;

use super::Buffer;

/// R-tree entry pointing back at a buffer by position
#[derive(Debug, Clone)]
struct IndexedBuffer {
    position: usize,
    envelope: AABB<[f64; 2]>,
}

impl RTreeObject for IndexedBuffer {
    type Envelope = AABB<[f64; 2]>;

    fn envelope(&self) -> Self::Envelope {
        self.envelope
    }
}

/// R-tree over buffer envelopes, borrowing the buffers it indexes
pub struct BufferIndex<'a> {
    buffers: &'a [Buffer],
    tree: RTree<IndexedBuffer>,
}

impl<'a> BufferIndex<'a> {
    pub fn build(buffers: &'a [Buffer]) -> Self {
        let indexed: Vec<IndexedBuffer> = buffers
            .iter()
            .enumerate()
            .map(|(position, buffer)| {
                let rect = buffer.bounding_rect();
                IndexedBuffer {
                    position,
                    envelope: AABB::from_corners(
                        [rect.min().x, rect.min().y],
                        [rect.max().x, rect.max().y],
                    ),
                }
            })
            .collect();

        let tree = RTree::bulk_load(indexed);
        debug!("Buffer index built with {} entries", tree.size());

        Self { buffers, tree }
    }

    /// Every buffer containing the point, in buffer order.
    ///
    /// Envelope intersection narrows the candidates; each candidate is then
    /// checked against its exact disc. All matches are returned, not just the
    /// nearest.
    pub fn lookup(&self, point: &Point<f64>) -> Vec<&'a Buffer> {
        let buffers = self.buffers;
        let query_envelope = AABB::from_point([point.x(), point.y()]);

        let mut positions: Vec<usize> = self
            .tree
            .locate_in_envelope_intersecting(&query_envelope)
            .filter(|ib| buffers[ib.position].contains_point(point))
            .map(|ib| ib.position)
            .collect();
        positions.sort_unstable();

        positions.into_iter().map(|p| &buffers[p]).collect()
    }

    pub fn len(&self) -> usize {
        self.tree.size()
    }

    pub fn is_empty(&self) -> bool {
        self.tree.size() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn buffer(id: &str, x: f64, y: f64, radius: f64) -> Buffer {
        Buffer {
            substation_id: id.to_string(),
            center: Point::new(x, y),
            radius,
        }
    }

    #[test]
    fn test_empty_index() {
        let index = BufferIndex::build(&[]);
        assert!(index.is_empty());
        assert!(index.lookup(&Point::new(0.0, 0.0)).is_empty());
    }

    #[test]
    fn test_overlapping_buffers_all_returned() {
        let buffers = vec![
            buffer("c", 300.0, 0.0, 200.0),
            buffer("a", 0.0, 0.0, 200.0),
            buffer("b", 5000.0, 0.0, 200.0),
        ];
        let index = BufferIndex::build(&buffers);
        assert_eq!(index.len(), 3);

        let hits: Vec<&str> = index
            .lookup(&Point::new(150.0, 0.0))
            .iter()
            .map(|b| b.substation_id.as_str())
            .collect();
        assert_eq!(hits, vec!["c", "a"]);
    }

    #[test]
    fn test_envelope_corner_is_not_a_hit() {
        // Inside the bounding box but outside the disc
        let buffers = vec![buffer("a", 0.0, 0.0, 200.0)];
        let index = BufferIndex::build(&buffers);
        assert!(index.lookup(&Point::new(190.0, 190.0)).is_empty());
        assert_eq!(index.lookup(&Point::new(200.0, 0.0)).len(), 1);
    }
}
