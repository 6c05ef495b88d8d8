use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::geo::{LatLong, distance_m, interpolate, project_on_segment};

#[derive(Debug, Error)]
pub enum RouteError {
    #[error("failed to read route file {path:?}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse route file {path:?}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("route '{name}' needs at least two points, got {count}")]
    TooFewPoints { name: String, count: usize },
    #[error("unknown route '{name}' (looked in {dir:?})")]
    UnknownRoute { name: String, dir: PathBuf },
}

#[derive(Debug, Serialize, Deserialize)]
struct RouteFile {
    #[serde(default)]
    name: Option<String>,
    /// `[lat, lon]` pairs
    points: Vec<[f64; 2]>,
}

/// Where a position lies along a route.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RouteProjection {
    pub linear_position: f64,
    pub distance_to_route: f64,
}

/// A polyline with the cumulative distance of every node.
#[derive(Debug, Clone)]
pub struct Route {
    name: String,
    points: Vec<LatLong>,
    cumulative: Vec<f64>,
}

impl Route {
    pub fn new(name: impl Into<String>, points: Vec<LatLong>) -> Result<Self, RouteError> {
        let name = name.into();
        if points.len() < 2 {
            return Err(RouteError::TooFewPoints {
                name,
                count: points.len(),
            });
        }

        let mut cumulative = Vec::with_capacity(points.len());
        cumulative.push(0.0);
        for pair in points.windows(2) {
            let last = cumulative[cumulative.len() - 1];
            cumulative.push(last + distance_m(pair[0], pair[1]));
        }

        Ok(Self {
            name,
            points,
            cumulative,
        })
    }

    /// Reads a route from `{"name": "...", "points": [[lat, lon], ...]}`.
    /// Without a name the file stem is used.
    pub fn load(path: &Path) -> Result<Self, RouteError> {
        let content = fs::read_to_string(path).map_err(|source| RouteError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let file: RouteFile = serde_json::from_str(&content).map_err(|source| RouteError::Json {
            path: path.to_path_buf(),
            source,
        })?;

        let name = file.name.unwrap_or_else(|| {
            path.file_stem()
                .map(|s| s.to_string_lossy().into_owned())
                .unwrap_or_default()
        });
        let points = file
            .points
            .into_iter()
            .map(|[lat, lon]| LatLong::new(lat, lon))
            .collect();

        let route = Self::new(name, points)?;
        debug!("Loaded route '{}' ({:.0} m) from {:?}", route.name, route.length(), path);
        Ok(route)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[LatLong] {
        &self.points
    }

    pub fn length(&self) -> f64 {
        self.cumulative[self.cumulative.len() - 1]
    }

    /// Coordinate at `linear` metres from the start, clamped to the route.
    pub fn position_at(&self, linear: f64) -> LatLong {
        let linear = linear.clamp(0.0, self.length());
        let last_segment = self.points.len() - 2;
        let segment = self
            .cumulative
            .partition_point(|&c| c <= linear)
            .saturating_sub(1)
            .min(last_segment);

        let start = self.cumulative[segment];
        let span = self.cumulative[segment + 1] - start;
        let fraction = if span > 0.0 {
            (linear - start) / span
        } else {
            0.0
        };
        interpolate(self.points[segment], self.points[segment + 1], fraction)
    }

    /// Maps a coordinate to a linear position on the route.
    ///
    /// Only segments within `max_distance` metres are candidates. With a
    /// `hint` the candidate closest to it along the route wins, which keeps
    /// participants on the right leg of out-and-back routes; otherwise the
    /// geometrically closest segment wins.
    pub fn project(
        &self,
        point: LatLong,
        max_distance: f64,
        hint: Option<f64>,
    ) -> Option<RouteProjection> {
        let mut best: Option<RouteProjection> = None;

        for (i, pair) in self.points.windows(2).enumerate() {
            let (fraction, distance) = project_on_segment(point, pair[0], pair[1]);
            if distance > max_distance {
                continue;
            }
            let span = self.cumulative[i + 1] - self.cumulative[i];
            let candidate = RouteProjection {
                linear_position: self.cumulative[i] + fraction * span,
                distance_to_route: distance,
            };

            let better = match (&best, hint) {
                (None, _) => true,
                (Some(current), Some(hint)) => {
                    let current_gap = (current.linear_position - hint).abs();
                    let candidate_gap = (candidate.linear_position - hint).abs();
                    candidate_gap < current_gap
                        || (candidate_gap == current_gap
                            && candidate.distance_to_route < current.distance_to_route)
                }
                (Some(current), None) => candidate.distance_to_route < current.distance_to_route,
            };
            if better {
                best = Some(candidate);
            }
        }

        best
    }
}

/// Directory of `<name>.json` route files.
pub struct RouteStore {
    dir: PathBuf,
}

impl RouteStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn load(&self, name: &str) -> Result<Route, RouteError> {
        let path = self.dir.join(format!("{name}.json"));
        if !path.is_file() {
            return Err(RouteError::UnknownRoute {
                name: name.to_string(),
                dir: self.dir.clone(),
            });
        }
        Route::load(&path)
    }

    /// Names of all routes in the directory, sorted.
    pub fn names(&self) -> Result<Vec<String>, RouteError> {
        let entries = fs::read_dir(&self.dir).map_err(|source| RouteError::Io {
            path: self.dir.clone(),
            source,
        })?;

        let mut names = Vec::new();
        for entry in entries {
            let path = entry
                .map_err(|source| RouteError::Io {
                    path: self.dir.clone(),
                    source,
                })?
                .path();
            if path.extension().and_then(|e| e.to_str()) == Some("json") {
                if let Some(stem) = path.file_stem() {
                    names.push(stem.to_string_lossy().into_owned());
                }
            }
        }
        names.sort();
        Ok(names)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // Roughly 741 m per 0.01 degree of longitude at 48N
    fn straight_route() -> Route {
        Route::new(
            "straight",
            vec![
                LatLong::new(48.0, 11.0),
                LatLong::new(48.0, 11.01),
                LatLong::new(48.0, 11.02),
            ],
        )
        .unwrap()
    }

    #[test]
    fn needs_two_points() {
        let err = Route::new("tiny", vec![LatLong::new(48.0, 11.0)]).unwrap_err();
        assert!(matches!(err, RouteError::TooFewPoints { count: 1, .. }));
    }

    #[test]
    fn length_is_sum_of_segments() {
        let route = straight_route();
        let expected = 2.0 * distance_m(LatLong::new(48.0, 11.0), LatLong::new(48.0, 11.01));
        assert!((route.length() - expected).abs() < 1e-6);
    }

    #[test]
    fn position_at_interpolates() {
        let route = straight_route();
        let half = route.length() / 2.0;
        let middle = route.position_at(half);
        assert!((middle.lon - 11.01).abs() < 1e-9);

        let quarter = route.position_at(half / 2.0);
        assert!((quarter.lon - 11.005).abs() < 1e-6);

        assert_eq!(route.position_at(-10.0), LatLong::new(48.0, 11.0));
        assert_eq!(route.position_at(1e9), LatLong::new(48.0, 11.02));
    }

    #[test]
    fn projection_round_trips_position() {
        let route = straight_route();
        let target = route.length() * 0.3;
        let projection = route
            .project(route.position_at(target), 50.0, None)
            .unwrap();
        assert!((projection.linear_position - target).abs() < 1.0);
        assert!(projection.distance_to_route < 1.0);
    }

    #[test]
    fn projection_outside_range() {
        let route = straight_route();
        assert!(route.project(LatLong::new(48.01, 11.01), 200.0, None).is_none());
    }

    #[test]
    fn hint_selects_the_leg() {
        // Out and back on the same street
        let route = Route::new(
            "loop",
            vec![
                LatLong::new(48.0, 11.0),
                LatLong::new(48.0, 11.01),
                LatLong::new(48.0, 11.0),
            ],
        )
        .unwrap();
        let leg = route.length() / 2.0;
        let point = LatLong::new(48.0, 11.005);

        let outbound = route.project(point, 50.0, Some(0.0)).unwrap();
        let inbound = route.project(point, 50.0, Some(route.length())).unwrap();
        assert!((outbound.linear_position - leg / 2.0).abs() < 1.0);
        assert!((inbound.linear_position - leg * 1.5).abs() < 1.0);
    }

    #[test]
    fn store_lists_and_loads_routes() {
        let temp = tempfile::tempdir().unwrap();
        let dir = temp.path();
        fs::write(dir.join("Nord.json"), r#"{"points": [[48.0, 11.0], [48.0, 11.01]]}"#).unwrap();
        fs::write(dir.join("Ost.json"), r#"{"name": "Ost", "points": [[48.0, 11.0], [48.01, 11.0]]}"#).unwrap();
        fs::write(dir.join("README.txt"), "not a route").unwrap();

        let store = RouteStore::new(dir);
        assert_eq!(store.names().unwrap(), vec!["Nord", "Ost"]);
        let nord = store.load("Nord").unwrap();
        assert_eq!(nord.name(), "Nord");
        assert_eq!(nord.points().len(), 2);
    }

    #[test]
    fn store_reports_unknown_route() {
        let store = RouteStore::new("/nonexistent/routes");
        let err = store.load("Nord").unwrap_err();
        assert!(matches!(err, RouteError::UnknownRoute { ref name, .. } if name == "Nord"));
    }
}
