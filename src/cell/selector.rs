use serde::Serialize;

use super::types::{CellInfo, CellInfoProvider, CellSource, LteIdentity};

/// Cell id reported when no cell could be attributed to a sample.
pub const NO_CELL_ID: i64 = -1;

/// Platform marker for an LTE field the modem did not report.
const UNAVAILABLE: i32 = i32::MAX;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellSelection {
    pub cell_id: i64,
    pub rsrp: Option<i32>,
    pub mcc: Option<String>,
    pub mnc: Option<String>,
    pub tac: Option<i32>,
    pub source: CellSource,
}

impl CellSelection {
    pub fn unknown() -> Self {
        Self {
            cell_id: NO_CELL_ID,
            rsrp: None,
            mcc: None,
            mnc: None,
            tac: None,
            source: CellSource::Unknown,
        }
    }

    fn from_lte(cell: &LteIdentity, source: CellSource) -> Self {
        Self {
            cell_id: available(cell.ci).map(i64::from).unwrap_or(NO_CELL_ID),
            rsrp: available(cell.rsrp),
            mcc: cell.mcc.clone().filter(|s| !s.is_empty()),
            mnc: cell.mnc.clone().filter(|s| !s.is_empty()),
            tac: available(cell.tac),
            source,
        }
    }
}

fn available(value: Option<i32>) -> Option<i32> {
    value.filter(|v| *v != UNAVAILABLE)
}

/// Picks the cell a sample is attributed to.
///
/// The first registered LTE cell wins. Failing that, the first LTE cell of any
/// registration status is used. Other radio technologies are never picked.
pub fn select(cells: Option<&[CellInfo]>) -> CellSelection {
    let Some(cells) = cells else {
        return CellSelection::unknown();
    };

    if let Some(cell) = cells
        .iter()
        .filter(|c| c.registered)
        .find_map(CellInfo::lte)
    {
        return CellSelection::from_lte(cell, CellSource::LteRegistered);
    }

    cells
        .iter()
        .find_map(CellInfo::lte)
        .map(|cell| CellSelection::from_lte(cell, CellSource::LteAny))
        .unwrap_or_else(CellSelection::unknown)
}

/// Queries `provider` and selects a cell. Provider failures degrade to
/// [`CellSelection::unknown`].
pub fn lookup(provider: &dyn CellInfoProvider) -> CellSelection {
    match provider.all_cell_info() {
        Ok(cells) => select(cells.as_deref()),
        Err(e) => {
            log::warn!("Cell info lookup failed: {}", e);
            CellSelection::unknown()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::types::RadioInfo;
    use crate::cell::CellInfoError;

    fn lte(registered: bool, ci: i32, rsrp: i32) -> CellInfo {
        CellInfo {
            registered,
            radio: RadioInfo::Lte(LteIdentity {
                ci: Some(ci),
                mcc: Some("432".into()),
                mnc: Some("11".into()),
                tac: Some(7),
                rsrp: Some(rsrp),
            }),
        }
    }

    fn other(registered: bool, radio: RadioInfo) -> CellInfo {
        CellInfo { registered, radio }
    }

    struct Fixed(Result<Option<Vec<CellInfo>>, CellInfoError>);

    impl CellInfoProvider for Fixed {
        fn all_cell_info(&self) -> Result<Option<Vec<CellInfo>>, CellInfoError> {
            self.0.clone()
        }
    }

    #[test]
    fn registered_lte_wins() {
        let cells = vec![lte(false, 200, -95), lte(true, 100, -90)];
        let selection = select(Some(&cells[..]));
        assert_eq!(selection.cell_id, 100);
        assert_eq!(selection.rsrp, Some(-90));
        assert_eq!(selection.source, CellSource::LteRegistered);
    }

    #[test]
    fn falls_back_to_first_lte() {
        let cells = vec![lte(false, 200, -95), lte(false, 300, -80)];
        let selection = select(Some(&cells[..]));
        assert_eq!(selection.cell_id, 200);
        assert_eq!(selection.rsrp, Some(-95));
        assert_eq!(selection.mcc.as_deref(), Some("432"));
        assert_eq!(selection.mnc.as_deref(), Some("11"));
        assert_eq!(selection.tac, Some(7));
        assert_eq!(selection.source, CellSource::LteAny);
    }

    #[test]
    fn registered_non_lte_is_skipped() {
        let cells = vec![
            other(true, RadioInfo::Nr),
            other(true, RadioInfo::Gsm),
            lte(false, 200, -95),
        ];
        let selection = select(Some(&cells[..]));
        assert_eq!(selection.cell_id, 200);
        assert_eq!(selection.source, CellSource::LteAny);
    }

    #[test]
    fn nothing_to_select() {
        assert_eq!(select(None), CellSelection::unknown());
        let empty: Vec<CellInfo> = Vec::new();
        assert_eq!(select(Some(empty.as_slice())), CellSelection::unknown());

        let cells = vec![other(true, RadioInfo::Wcdma), other(false, RadioInfo::Cdma)];
        let selection = select(Some(&cells[..]));
        assert_eq!(selection.cell_id, NO_CELL_ID);
        assert_eq!(selection.rsrp, None);
        assert_eq!(selection.source, CellSource::Unknown);
    }

    #[test]
    fn partial_lte_fields_stay_independent() {
        let cells = vec![CellInfo {
            registered: true,
            radio: RadioInfo::Lte(LteIdentity {
                ci: Some(UNAVAILABLE),
                mcc: Some(String::new()),
                mnc: Some("20".into()),
                tac: None,
                rsrp: Some(-101),
            }),
        }];
        let selection = select(Some(&cells[..]));
        assert_eq!(selection.cell_id, NO_CELL_ID);
        assert_eq!(selection.mcc, None);
        assert_eq!(selection.mnc.as_deref(), Some("20"));
        assert_eq!(selection.tac, None);
        assert_eq!(selection.rsrp, Some(-101));
        assert_eq!(selection.source, CellSource::LteRegistered);
    }

    #[test]
    fn lookup_degrades_on_provider_failure() {
        let denied = Fixed(Err(CellInfoError::PermissionDenied));
        assert_eq!(lookup(&denied), CellSelection::unknown());

        let off = Fixed(Ok(None));
        assert_eq!(lookup(&off), CellSelection::unknown());

        let ok = Fixed(Ok(Some(vec![lte(true, 100, -90)])));
        assert_eq!(lookup(&ok).cell_id, 100);
    }
}
