use std::path::{Path, PathBuf};

use cosmo_core::ColumnName;

/// Deterministic artifact file names under one output directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ArtifactNames {
    outdir: PathBuf,
    prefix: Option<String>,
    suffix: String,
}

impl ArtifactNames {
    pub fn new(outdir: impl Into<PathBuf>, prefix: Option<&str>, suffix: &str) -> Self {
        Self {
            outdir: outdir.into(),
            prefix: prefix
                .map(str::trim)
                .filter(|prefix| !prefix.is_empty())
                .map(str::to_owned),
            suffix: suffix.trim_start_matches('.').to_owned(),
        }
    }

    pub fn outdir(&self) -> &Path {
        &self.outdir
    }

    /// `{prefix}_{column}.{suffix}`
    pub fn one_d(&self, column: &ColumnName) -> PathBuf {
        self.file(&format!("{}.{}", column.as_str(), self.suffix))
    }

    /// `{prefix}_2D_{later}_{earlier}.{suffix}`, `later` being the column that
    /// appears later in the schema.
    pub fn two_d(&self, later: &ColumnName, earlier: &ColumnName) -> PathBuf {
        self.file(&format!(
            "2D_{}_{}.{}",
            later.as_str(),
            earlier.as_str(),
            self.suffix
        ))
    }

    /// `{prefix}_means.txt`
    pub fn means(&self) -> PathBuf {
        self.file("means.txt")
    }

    fn file(&self, stem: &str) -> PathBuf {
        match &self.prefix {
            Some(prefix) => self.outdir.join(format!("{prefix}_{stem}")),
            None => self.outdir.join(stem),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(name: &str) -> ColumnName {
        ColumnName::sectioned("parameters", name).unwrap()
    }

    #[test]
    fn prefix_is_optional() {
        let named = ArtifactNames::new("/tmp/out", Some("emcee"), "png");
        assert_eq!(
            named.one_d(&p("p1")),
            PathBuf::from("/tmp/out/emcee_parameters--p1.png")
        );
        let bare = ArtifactNames::new("/tmp/out", None, ".pdf");
        assert_eq!(
            bare.two_d(&p("p2"), &p("p1")),
            PathBuf::from("/tmp/out/2D_parameters--p2_parameters--p1.pdf")
        );
        assert_eq!(bare.means(), PathBuf::from("/tmp/out/means.txt"));
    }

    #[test]
    fn blank_prefix_behaves_like_none() {
        let names = ArtifactNames::new("out", Some("  "), "png");
        assert_eq!(names.means(), PathBuf::from("out/means.txt"));
    }
}
