//! Uniform-grid lookup of atoms within a distance of a query point.

use std::collections::HashMap;

use crate::model::{Atom, Point3D};

type Cell = (i64, i64, i64);

/// Points bucketed into cubic cells whose edge equals the search radius,
/// so a query only visits the 27 surrounding cells.
#[derive(Debug, Clone)]
pub struct NeighborGrid {
    cell_size: f64,
    points: Vec<Point3D>,
    cells: HashMap<Cell, Vec<usize>>,
}

impl NeighborGrid {
    pub fn new<'a, I>(atoms: I, radius: f64) -> Self
    where
        I: IntoIterator<Item = &'a Atom>,
    {
        let cell_size = radius.max(f64::EPSILON);
        let points: Vec<Point3D> = atoms.into_iter().map(|a| a.coords).collect();
        let mut cells: HashMap<Cell, Vec<usize>> = HashMap::new();
        for (i, p) in points.iter().enumerate() {
            cells.entry(cell_of(p, cell_size)).or_default().push(i);
        }
        Self { cell_size, points, cells }
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    /// Whether any point lies within `radius` of `query`. `radius` must not
    /// exceed the radius the grid was built with.
    pub fn any_within(&self, query: &Point3D, radius: f64) -> bool {
        let (cx, cy, cz) = cell_of(query, self.cell_size);
        for dx in -1..=1 {
            for dy in -1..=1 {
                for dz in -1..=1 {
                    let Some(idx) = self.cells.get(&(cx + dx, cy + dy, cz + dz)) else {
                        continue;
                    };
                    if idx.iter().any(|&i| self.points[i].distance_to(query) <= radius) {
                        return true;
                    }
                }
            }
        }
        false
    }
}

fn cell_of(p: &Point3D, size: f64) -> Cell {
    (
        (p.x / size).floor() as i64,
        (p.y / size).floor() as i64,
        (p.z / size).floor() as i64,
    )
}

/// Smallest distance between any pair drawn from `a` and `b`.
pub fn min_distance<'a, 'b, A, B>(a: A, b: B) -> Option<f64>
where
    A: IntoIterator<Item = &'a Atom>,
    B: IntoIterator<Item = &'b Atom> + Clone,
{
    a.into_iter()
        .flat_map(|x| b.clone().into_iter().map(move |y| x.coords.distance_to(&y.coords)))
        .reduce(f64::min)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn atom_at(x: f64, y: f64, z: f64) -> Atom {
        Atom {
            serial: 0,
            name: " C  ".to_string(),
            coords: Point3D::new(x, y, z),
            element: "C".to_string(),
            is_hetatm: false,
        }
    }

    #[test]
    fn test_grid_matches_brute_force() {
        let atoms: Vec<Atom> = (0..50)
            .map(|i| {
                let f = i as f64;
                atom_at((f * 1.7) % 23.0 - 11.0, (f * 3.1) % 19.0 - 9.0, (f * 0.9) % 13.0 - 6.0)
            })
            .collect();
        let grid = NeighborGrid::new(&atoms, 5.0);

        for q in [
            Point3D::new(0.0, 0.0, 0.0),
            Point3D::new(30.0, 30.0, 30.0),
            Point3D::new(-10.0, 8.0, 5.5),
        ] {
            let brute = atoms.iter().any(|a| a.coords.distance_to(&q) <= 5.0);
            assert_eq!(grid.any_within(&q, 5.0), brute);
        }
    }

    #[test]
    fn test_cutoff_is_inclusive() {
        let atoms = vec![atom_at(5.0, 0.0, 0.0)];
        let grid = NeighborGrid::new(&atoms, 5.0);
        assert!(grid.any_within(&Point3D::zero(), 5.0));
        assert!(!grid.any_within(&Point3D::new(-0.1, 0.0, 0.0), 5.0));
    }

    #[test]
    fn test_min_distance() {
        let a = vec![atom_at(0.0, 0.0, 0.0), atom_at(1.0, 0.0, 0.0)];
        let b = vec![atom_at(4.0, 0.0, 0.0), atom_at(10.0, 0.0, 0.0)];
        assert_eq!(min_distance(&a, &b), Some(3.0));
        assert_eq!(min_distance(&a, &Vec::<Atom>::new()), None);
    }
}
