//! Universe configuration: the ordered ticker list a collection run covers.
//!
//! The universe is an explicit value passed to the orchestrator. It is stored
//! either as a TOML file (`tickers = [...]`) or as a plain text list with one
//! ticker per line, which is also the format of the failed-tickers manifest.
//! Order is preserved and duplicates are kept: each occurrence becomes its own task.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum UniverseError {
    #[error("read universe file {path}: {message}")]
    Read { path: String, message: String },

    #[error("parse universe TOML: {0}")]
    Parse(String),

    #[error("blank ticker at position {0}")]
    BlankTicker(usize),
}

/// Ordered ticker universe.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Universe {
    pub tickers: Vec<String>,
}

impl Universe {
    pub fn new<S: Into<String>>(tickers: impl IntoIterator<Item = S>) -> Self {
        Self {
            tickers: tickers.into_iter().map(Into::into).collect(),
        }
    }

    /// Load from disk. `.toml` files are parsed as TOML, anything else as a
    /// line list.
    pub fn from_file(path: &Path) -> Result<Self, UniverseError> {
        let content = std::fs::read_to_string(path).map_err(|e| UniverseError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        if path.extension().and_then(|e| e.to_str()) == Some("toml") {
            Self::from_toml(&content)
        } else {
            Ok(Self::from_lines(&content))
        }
    }

    /// Parse a universe from a TOML string.
    pub fn from_toml(content: &str) -> Result<Self, UniverseError> {
        let universe: Universe =
            toml::from_str(content).map_err(|e| UniverseError::Parse(e.to_string()))?;
        let mut tickers = Vec::with_capacity(universe.tickers.len());
        for (i, t) in universe.tickers.into_iter().enumerate() {
            let t = t.trim();
            if t.is_empty() {
                return Err(UniverseError::BlankTicker(i));
            }
            tickers.push(t.to_string());
        }
        Ok(Self { tickers })
    }

    /// One ticker per line; blank lines and `#` comments are ignored.
    pub fn from_lines(content: &str) -> Self {
        Self::new(
            content
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty() && !l.starts_with('#')),
        )
    }

    pub fn tickers(&self) -> &[String] {
        &self.tickers
    }

    pub fn len(&self) -> usize {
        self.tickers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tickers.is_empty()
    }

    /// Tickers that occur more than once, each reported once, in the order their
    /// first repeat appears.
    pub fn duplicates(&self) -> Vec<&str> {
        let mut seen = HashSet::new();
        let mut reported = HashSet::new();
        let mut dups = Vec::new();
        for t in &self.tickers {
            if !seen.insert(t.as_str()) && reported.insert(t.as_str()) {
                dups.push(t.as_str());
            }
        }
        dups
    }

    /// Serialize the universe to TOML.
    pub fn to_toml(&self) -> Result<String, UniverseError> {
        toml::to_string_pretty(self).map_err(|e| UniverseError::Parse(e.to_string()))
    }

    /// The historical S&P 500 list the collector was built around.
    ///
    /// Kept verbatim, including its repeated entries (GOOG, GOOGL, CMCSA, GRMN,
    /// IBM, PGR, TXN, TMO, TJX, TSLA) and symbols that have since been delisted.
    pub fn sp500() -> Self {
        Self::new(SP500.iter().copied())
    }
}

const SP500: &[&str] = &[
    "MMM", "AOS", "ABT", "ABBV", "ACN", "ADBE", "AMD", "AES", "AFL", "A", "APD", "ABNB", "AKAM",
    "ALB", "ARE", "ALGN", "ALLE", "LNT", "ALL", "GOOGL", "GOOG", "MO", "AMZN", "AMCR", "AEE",
    "AEP", "AXP", "AIG", "AMT", "AWK", "AMP", "AME", "AMGN", "APH", "ADI", "ANSS", "AON", "APA",
    "APO", "AAPL", "AMAT", "APTV", "ARCH", "ARNC", "ATO", "ATVI", "ADSK", "AZO", "AVB", "AVY",
    "BKR", "BAX", "BDX", "BRK.B", "BBY", "BIO", "BIIB", "BLK", "BX", "BAC", "BBWI", "BA", "BK",
    "BN", "BXP", "BSX", "BMY", "AVGO", "BR", "BRO", "BF.B", "BF.A", "CPB", "COF", "CAH", "KMX",
    "CCL", "CARR", "CAT", "CBOE", "CDNS", "CDW", "CE", "CNC", "CNP", "CDAY", "CERN", "CF", "CRL",
    "SCHW", "CHTR", "CVX", "CMG", "CB", "CHD", "CI", "CINF", "CTAS", "C", "CLX", "CME", "CMS",
    "KO", "CTSH", "CL", "CMCSA", "CAG", "COP", "STZ", "CEG", "COR", "CSGP", "CMA", "CSC", "CMCSA",
    "CACC", "CSX", "CTLT", "CVS", "DHR", "DRI", "DVA", "DE", "DAL", "XRAY", "DVN", "DXCM", "FANG",
    "DLR", "DFS", "DIS", "DG", "DLTR", "D", "DPZ", "DOV", "DOW", "DTE", "DUK", "DD", "EMN", "ETN",
    "EBAY", "ECL", "EIX", "EW", "EA", "EMR", "ENPH", "ETR", "EOG", "EQIX", "EQT", "ES", "ESS",
    "ELV", "ETSY", "EVRG", "ESRX", "EXC", "EXPE", "EXPD", "XOM", "FDS", "FAST", "FRT", "FDX", "FE",
    "FIS", "FITB", "FMC", "F", "FTNT", "FTV", "FOXA", "FOX", "BEN", "FCX", "GRMN", "IT", "GD", "GE",
    "GIS", "GM", "GPC", "GILD", "GLW", "GOOG", "GOOGL", "GPN", "GPS", "GRMN", "GS", "HAL", "HBI",
    "HAS", "HCA", "PEAK", "HSIC", "HES", "HWM", "HP", "HST", "HRL", "HLT", "HOLX", "HD", "HON",
    "HPE", "HPQ", "HUM", "HII", "IBM", "IEX", "IDXX", "IFF", "ILMN", "INCY", "IR", "INTC", "ICE",
    "IBM", "IP", "IPG", "INTU", "ISRG", "IVZ", "IRM", "JBL", "JKHY", "J", "JPM", "JNJ", "KSU", "K",
    "KVUE", "KMB", "KMI", "KLAC", "KSS", "KR", "LHX", "LRCX", "LW", "LVS", "LEG", "LEN", "LLY",
    "LNC", "LIN", "LYV", "LKQ", "LMT", "L", "LOW", "LULU", "MAR", "MMC", "MLM", "MAS", "MA", "MKC",
    "MCD", "MCK", "MDT", "MRK", "META", "MET", "MIK", "MSFT", "MCO", "MPC", "MDLZ", "MNST", "MORG",
    "MSI", "MS", "MOS", "MSCI", "NDAQ", "NEE", "NEM", "NFLX", "NWSA", "NWS", "NI", "NKE", "NOC",
    "NLOK", "NCLH", "NRG", "NUE", "NVDA", "NVR", "NXPI", "ORLY", "OXY", "ODFL", "OMC", "OKE",
    "ORCL", "OGN", "OTIS", "PCAR", "PKG", "PANW", "PARA", "PAYC", "PAYX", "PCG", "PEP", "PFE", "PM",
    "PSX", "PNR", "PBCT", "PGR", "PLD", "PNC", "POOL", "PPG", "PPL", "PFG", "PG", "PGR", "PRU",
    "PEG", "PSA", "PHM", "PVH", "QRVO", "PWR", "QCOM", "DGX", "RL", "RJF", "RTX", "O", "REGN", "RF",
    "RSG", "RMD", "RHI", "ROK", "ROL", "ROP", "ROST", "RCL", "SPGI", "CRM", "SBAC", "SLB", "STX",
    "SEE", "SRE", "NOW", "SHW", "SPG", "SWKS", "SJM", "SNA", "SO", "LUV", "SWK", "SBUX", "STT",
    "STE", "SYK", "SYF", "SNPS", "SYY", "TMUS", "TROW", "TTWO", "TPR", "TGT", "TEL", "TDY", "TFX",
    "TXN", "TXT", "TMO", "TJX", "TSLA", "TXN", "TMO", "TJX", "TSLA", "TRV", "TRMB", "TFC", "TWTR",
    "TYL", "UDR", "ULTA", "UNP", "UAL", "UNH", "UPS", "URI", "UHS", "VLO", "VAR", "VTR", "VRSK",
    "VRSN", "V", "VNO", "VMC", "WAB", "WBA", "WMT", "WBD", "WM", "WAT", "WEC", "WFC", "WELL", "WST",
    "WDC", "WRK", "WY", "WHR", "WMB", "WLTW", "WYNN", "XEL", "XLNX", "XYL", "YUM", "ZBH", "ZION",
    "ZTS",
];
