use std::collections::HashSet;
use std::fs;
use std::path::Path;
use std::sync::Arc;

use alloy::primitives::Address;
use eyre::{bail, eyre, Result};
use log::info;

use crate::types::pool::{DexVariant, Pool};

pub const POOL_CSV_HEADER: &str = "address,version,token0,token1,decimals0,decimals1,fee";

/// Loads the pool universe from a CSV cache file.
///
/// Rows must carry exactly seven columns matching [`POOL_CSV_HEADER`].
/// Duplicate addresses keep the first occurrence; file order is preserved
/// otherwise. A malformed row fails the whole load.
pub fn load_pools(path: &Path) -> Result<Vec<Arc<Pool>>> {
    let contents = fs::read_to_string(path)
        .map_err(|e| eyre!("Failed to read pool cache {}: {}", path.display(), e))?;

    let mut lines = contents.lines().enumerate();
    match lines.next() {
        Some((_, header)) if header.trim() == POOL_CSV_HEADER => (),
        Some((_, header)) => bail!("Unexpected pool cache header: {:?}", header),
        None => bail!("Pool cache {} is empty", path.display()),
    }

    let mut pools: Vec<Arc<Pool>> = Vec::new();
    let mut seen: HashSet<Address> = HashSet::new();

    for (line_number, line) in lines {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let columns: Vec<&str> = line.split(',').map(str::trim).collect();
        if columns.len() != 7 {
            bail!("Line {}: expected 7 columns, found {}", line_number + 1, columns.len());
        }

        let address: Address = columns[0]
            .parse()
            .map_err(|e| eyre!("Line {}: bad pool address: {}", line_number + 1, e))?;
        let variant = match columns[1] {
            "2" => DexVariant::UniswapV2,
            "3" => DexVariant::UniswapV3,
            other => bail!("Line {}: unknown pool version {:?}", line_number + 1, other),
        };
        let token0: Address = columns[2]
            .parse()
            .map_err(|e| eyre!("Line {}: bad token0 address: {}", line_number + 1, e))?;
        let token1: Address = columns[3]
            .parse()
            .map_err(|e| eyre!("Line {}: bad token1 address: {}", line_number + 1, e))?;
        let decimals0: u8 = columns[4]
            .parse()
            .map_err(|e| eyre!("Line {}: bad decimals0: {}", line_number + 1, e))?;
        let decimals1: u8 = columns[5]
            .parse()
            .map_err(|e| eyre!("Line {}: bad decimals1: {}", line_number + 1, e))?;
        let fee: u32 = columns[6]
            .parse()
            .map_err(|e| eyre!("Line {}: bad fee: {}", line_number + 1, e))?;
        // Fee is parts per 100000; anything at or above 100% is a corrupt row.
        if fee >= 100_000 {
            bail!("Line {}: fee {} out of range", line_number + 1, fee);
        }

        if !seen.insert(address) {
            continue;
        }

        pools.push(Arc::new(Pool {
            address,
            variant,
            token0,
            token1,
            decimals0,
            decimals1,
            fee,
        }));
    }

    info!("Loaded {} pools from {}", pools.len(), path.display());
    Ok(pools)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_cache(name: &str, contents: &str) -> std::path::PathBuf {
        let path = std::env::temp_dir().join(name);
        let mut file = fs::File::create(&path).unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        path
    }

    const ROW_A: &str =
        "0x1111111111111111111111111111111111111111,2,0x2222222222222222222222222222222222222222,0x3333333333333333333333333333333333333333,6,18,300";

    #[test]
    fn test_load_pools_happy_path() {
        let contents = format!(
            "{}\n{}\n\n0x4444444444444444444444444444444444444444,3,0x2222222222222222222222222222222222222222,0x3333333333333333333333333333333333333333,18,18,500\n",
            POOL_CSV_HEADER, ROW_A
        );
        let path = write_cache("pool_loader_happy.csv", &contents);

        let pools = load_pools(&path).unwrap();
        assert_eq!(pools.len(), 2);
        assert_eq!(pools[0].address, Address::repeat_byte(0x11));
        assert_eq!(pools[0].variant, DexVariant::UniswapV2);
        assert_eq!(pools[0].decimals0, 6);
        assert_eq!(pools[0].fee, 300);
        assert_eq!(pools[1].variant, DexVariant::UniswapV3);
    }

    #[test]
    fn test_load_pools_dedups_by_address() {
        let contents = format!("{}\n{}\n{}\n", POOL_CSV_HEADER, ROW_A, ROW_A);
        let path = write_cache("pool_loader_dedup.csv", &contents);
        assert_eq!(load_pools(&path).unwrap().len(), 1);
    }

    #[test]
    fn test_load_pools_rejects_short_row() {
        let contents = format!("{}\n0x1111111111111111111111111111111111111111,2,6\n", POOL_CSV_HEADER);
        let path = write_cache("pool_loader_short.csv", &contents);
        let err = load_pools(&path).unwrap_err();
        assert!(err.to_string().contains("expected 7 columns"));
    }

    #[test]
    fn test_load_pools_rejects_unknown_version() {
        let row = ROW_A.replacen(",2,", ",4,", 1);
        let contents = format!("{}\n{}\n", POOL_CSV_HEADER, row);
        let path = write_cache("pool_loader_version.csv", &contents);
        assert!(load_pools(&path).is_err());
    }

    #[test]
    fn test_load_pools_rejects_out_of_range_fee() {
        let row = ROW_A.replace(",300", ",200000");
        let contents = format!("{}\n{}\n", POOL_CSV_HEADER, row);
        let path = write_cache("pool_loader_fee.csv", &contents);
        let err = load_pools(&path).unwrap_err();
        assert!(err.to_string().contains("out of range"));
    }

    #[test]
    fn test_load_pools_rejects_bad_header() {
        let path = write_cache("pool_loader_header.csv", "addr,ver\n");
        let err = load_pools(&path).unwrap_err();
        assert!(err.to_string().contains("header"));
    }
}
