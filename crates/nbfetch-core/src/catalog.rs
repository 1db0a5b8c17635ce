//! Fixed coursework resource bundles

use crate::error::{FetchError, Result};
use crate::fetch::Fetcher;
use nbfetch_types::FetchReport;
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use tokio::fs;
use tracing::info;

/// A file hosted by a third-party dataset server
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub url: &'static str,
    pub filename: &'static str,
}

const WEEK3_ASSETS: &[Asset] = &[
    Asset {
        url: "http://www.robots.ox.ac.uk/~vgg/data/flowers/102/102flowers.tgz",
        filename: "102flowers.tgz",
    },
    Asset {
        url: "http://www.robots.ox.ac.uk/~vgg/data/flowers/102/imagelabels.mat",
        filename: "imagelabels.mat",
    },
];

const WEEK4_ASSETS: &[Asset] = &[
    Asset {
        url: "http://www.cs.columbia.edu/CAVE/databases/pubfig/download/lfw_attributes.txt",
        filename: "lfw_attributes.txt",
    },
    Asset {
        url: "http://vis-www.cs.umass.edu/lfw/lfw-deepfunneled.tgz",
        filename: "lfw-deepfunneled.tgz",
    },
    Asset {
        url: "http://vis-www.cs.umass.edu/lfw/lfw.tgz",
        filename: "lfw.tgz",
    },
];

const WEEK6_ASSETS: &[Asset] = &[
    Asset {
        url: "http://msvocds.blob.core.windows.net/coco2014/train2014.zip",
        filename: "train2014.zip",
    },
    Asset {
        url: "http://msvocds.blob.core.windows.net/coco2014/val2014.zip",
        filename: "val2014.zip",
    },
    Asset {
        url: "http://msvocds.blob.core.windows.net/annotations-1-0-3/captions_train-val2014.zip",
        filename: "captions_train-val2014.zip",
    },
];

/// Dataset bundles used by the weekly assignments
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceBundle {
    /// Oxford 102 flowers
    Week3,
    /// Labeled Faces in the Wild
    Week4,
    /// MS COCO 2014 with captions
    Week6,
}

impl ResourceBundle {
    pub const ALL: [ResourceBundle; 3] = [Self::Week3, Self::Week4, Self::Week6];

    pub fn name(self) -> &'static str {
        match self {
            Self::Week3 => "week3",
            Self::Week4 => "week4",
            Self::Week6 => "week6",
        }
    }

    pub fn assets(self) -> &'static [Asset] {
        match self {
            Self::Week3 => WEEK3_ASSETS,
            Self::Week4 => WEEK4_ASSETS,
            Self::Week6 => WEEK6_ASSETS,
        }
    }
}

impl fmt::Display for ResourceBundle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ResourceBundle {
    type Err = FetchError;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|bundle| bundle.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| FetchError::Config(format!("unknown resource bundle: {}", s)))
    }
}

impl Fetcher {
    /// Download every asset of `bundle` into `target_dir`, in order
    pub async fn fetch_bundle(
        &self,
        bundle: ResourceBundle,
        target_dir: impl AsRef<Path>,
    ) -> Result<Vec<FetchReport>> {
        let target_dir = target_dir.as_ref();
        fs::create_dir_all(target_dir).await?;

        info!("Fetching bundle {} into {}", bundle, target_dir.display());

        let mut reports = Vec::with_capacity(bundle.assets().len());
        for asset in bundle.assets() {
            reports.push(self.fetch(asset.url, target_dir.join(asset.filename)).await?);
        }
        Ok(reports)
    }
}
