use std::{
    collections::BTreeMap,
    fs::File,
    io::{BufRead, BufReader},
    path::{Path, PathBuf},
};

use logos::Logos;
use rayon::prelude::*;
use tracing::{debug, info, warn};

use crate::{
    error::{Result, SurfacePlotError},
    gradient::GradientKey,
    types::{Point, Value},
};

/// Tokens of one point-cloud line: three decimal numbers separated by optional commas.
#[derive(Logos, Debug, Clone, Copy, PartialEq)]
#[logos(skip r"[ \t\r\n\f]+")]
enum CloudToken {
    #[regex(r"-?[0-9]+\.[0-9]*([Ee][-+]?[0-9]*)?", |lex| lex.slice().parse::<f64>().ok())]
    Number(f64),
    #[token(",")]
    Comma,
}

/// Parses `x, y, z` from one line. Returns `None` for anything else.
///
/// Every number needs a decimal point and may carry an exponent; a comma may
/// follow the first and second number.
pub fn parse_line(line: &str) -> Option<[Value; 3]> {
    let mut lexer = CloudToken::lexer(line);
    let mut xyz = [0.; 3];
    let mut next = lexer.next();
    for (i, slot) in xyz.iter_mut().enumerate() {
        match next {
            Some(Ok(CloudToken::Number(v))) => *slot = v,
            _ => return None,
        }
        next = lexer.next();
        if i < 2 && next == Some(Ok(CloudToken::Comma)) {
            next = lexer.next();
        }
    }
    next.is_none().then_some(xyz)
}

/// Unit convention of a point-cloud file.
///
/// ```text
///            position scale   radius scale   z offset
/// Normalized 10 * spread      1              0
/// Raw         2 * spread      3              -2
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PointCloudLayout {
    Normalized,
    Raw,
}

impl PointCloudLayout {
    pub fn position_scale(&self, spread: Value) -> Value {
        match self {
            PointCloudLayout::Normalized => 10. * spread,
            PointCloudLayout::Raw => 2. * spread,
        }
    }

    pub fn radius_scale(&self) -> Value {
        match self {
            PointCloudLayout::Normalized => 1.,
            PointCloudLayout::Raw => 3.,
        }
    }

    /// Added to z before scaling.
    pub fn z_offset(&self) -> Value {
        match self {
            PointCloudLayout::Normalized => 0.,
            PointCloudLayout::Raw => -2.,
        }
    }

    /// Display position of a point read from a file in this layout.
    pub fn place(&self, [x, y, z]: [Value; 3], spread: Value) -> Point {
        let scale = self.position_scale(spread);
        Point::new(x * scale, y * scale, (z + self.z_offset()) * scale)
    }
}

/// A displayed point-cloud marker. Point clouds carry no scalar value, so every
/// marker uses the [`GradientKey::LAST`] entry.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PointCloudMarker {
    pub position: Point,
    pub radius: Value,
    pub colour_key: GradientKey,
}

/// Markers parsed from one source, plus how many lines did not parse.
#[derive(Debug, Clone, Default)]
pub struct PointCloud {
    pub markers: Vec<PointCloudMarker>,
    pub skipped: usize,
}

impl PointCloud {
    pub fn len(&self) -> usize {
        self.markers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.markers.is_empty()
    }
}

/// Turns point-cloud text into positioned markers.
#[derive(Debug, Clone, Copy)]
pub struct PointCloudLoader {
    pub spread: Value,
    /// Radius of a marker before the layout's radius scale is applied.
    pub marker_radius: Value,
}

impl PointCloudLoader {
    pub fn new(spread: Value, marker_radius: Value) -> Self {
        Self {
            spread,
            marker_radius,
        }
    }

    /// Parses `lines` in parallel, keeping line order. Lines that do not parse are skipped.
    pub fn parse<L>(&self, lines: &[L], layout: PointCloudLayout) -> PointCloud
    where
        L: AsRef<str> + Sync,
    {
        let radius = self.marker_radius * layout.radius_scale();
        let markers: Vec<PointCloudMarker> = lines
            .par_iter()
            .filter_map(|line| parse_line(line.as_ref()))
            .map(|xyz| PointCloudMarker {
                position: layout.place(xyz, self.spread),
                radius,
                colour_key: GradientKey::LAST,
            })
            .collect();
        let skipped = lines.len() - markers.len();
        if skipped > 0 {
            debug!(skipped, "skipped malformed point cloud lines");
        }
        PointCloud { markers, skipped }
    }

    /// Reads and parses the file at `path`.
    ///
    /// Fails with [`SurfacePlotError::Load`] if the file cannot be opened. A read
    /// error part way through is logged and the lines read so far are kept.
    pub fn load(&self, path: impl AsRef<Path>, layout: PointCloudLayout) -> Result<PointCloud> {
        let path = path.as_ref();
        let file = File::open(path).map_err(|source| SurfacePlotError::Load {
            path: path.to_path_buf(),
            source,
        })?;

        // Bytes that are not UTF-8 only spoil their own line, which then fails to parse.
        let mut reader = BufReader::new(file);
        let mut lines = Vec::new();
        let mut buf = Vec::new();
        loop {
            buf.clear();
            match reader.read_until(b'\n', &mut buf) {
                Ok(0) => break,
                Ok(_) => {
                    let line = String::from_utf8_lossy(&buf);
                    lines.push(line.trim_end_matches(['\n', '\r']).to_string());
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "point cloud read interrupted");
                    break;
                }
            }
        }

        let cloud = self.parse(&lines, layout);
        info!(
            path = %path.display(),
            markers = cloud.len(),
            skipped = cloud.skipped,
            "loaded point cloud"
        );
        Ok(cloud)
    }
}

/// A known point-cloud file and the unit convention it was written in.
#[derive(Debug, Clone, PartialEq)]
pub struct PointCloudSource {
    pub file_name: PathBuf,
    pub layout: PointCloudLayout,
}

/// Named point-cloud sources, resolved against a base directory.
#[derive(Debug, Clone, Default)]
pub struct PointCloudRegistry {
    base_dir: PathBuf,
    sources: BTreeMap<String, PointCloudSource>,
}

impl PointCloudRegistry {
    pub fn new(base_dir: impl Into<PathBuf>) -> Self {
        Self {
            base_dir: base_dir.into(),
            sources: BTreeMap::new(),
        }
    }

    /// The six bundled clouds. Teapot and Helix are stored in raw units.
    pub fn builtin(base_dir: impl Into<PathBuf>) -> Self {
        let mut registry = Self::new(base_dir);
        for (name, file_name) in [
            ("Benchy", "benchy.xyz"),
            ("Rabbit", "rabbit.xyz"),
            ("Sphere", "sphere.xyz"),
            ("Turtle Shell", "turtle.xyz"),
        ] {
            registry.insert(name, file_name, PointCloudLayout::Normalized);
        }
        registry.insert("Helix", "helix.xyz", PointCloudLayout::Raw);
        registry.insert("Teapot", "teapot.xyz", PointCloudLayout::Raw);
        registry
    }

    pub fn insert(
        &mut self,
        name: impl Into<String>,
        file_name: impl Into<PathBuf>,
        layout: PointCloudLayout,
    ) {
        self.sources.insert(
            name.into(),
            PointCloudSource {
                file_name: file_name.into(),
                layout,
            },
        );
    }

    pub fn get(&self, name: &str) -> Result<&PointCloudSource> {
        self.sources
            .get(name)
            .ok_or_else(|| SurfacePlotError::UnknownPointCloud(name.to_string()))
    }

    /// Full path of the named source's file.
    pub fn path_of(&self, name: &str) -> Result<PathBuf> {
        Ok(self.base_dir.join(&self.get(name)?.file_name))
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    pub fn set_base_dir(&mut self, base_dir: impl Into<PathBuf>) {
        self.base_dir = base_dir.into();
    }

    /// `(name, source)` pairs in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &PointCloudSource)> {
        self.sources.iter().map(|(name, source)| (name.as_str(), source))
    }
}
