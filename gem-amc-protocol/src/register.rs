use std::fmt::Display;

use crate::link::{Link, NUM_LINKS};

/// Every register of the GEM AMC address table used by the slow-control
/// and TTC blocks.
///
/// The dotted [`path`](Register::path) of each register is the name under which
/// it appears in the firmware address table and must not change.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Register {
    // SCA manual control
    ScaLinkEnableMask,
    ScaCmdChannel,
    ScaCmdCommand,
    ScaCmdLength,
    ScaCmdData,
    ScaCmdExecute,
    ScaReplyData(Link),

    // SCA monitoring and reset
    ScaMonitoringOff,
    ScaModuleReset,
    ScaResetEnableMask,
    ScaTtcHardResetEn,

    // TTC control
    TtcDisablePhaseAlignment,
    TtcPaDisableGthPhaseTracking,
    TtcPaManualOverride,
    TtcPaManualShiftDir,
    TtcPaGthManualOverride,
    TtcPaGthManualShiftDir,
    TtcPaGthManualShiftStep,
    TtcPaGthManualSelOverride,
    TtcPaGthManualCombined,
    TtcGthTxDlyBypass,
    TtcPaManualPllReset,
    TtcPaGthManualShiftEn,
    TtcCntReset,
    TtcMmcmReset,
    TtcL1aEnable,

    // TTC status
    TtcPaManualShiftCnt,
    TtcPaManualGthShiftCnt,
    TtcPmPhaseMean,
    TtcGthPmPhaseMean,
    TtcPhaseLocked,
    TtcBc0Locked,
    TtcSingleErrorCnt,
    TtcDoubleErrorCnt,

    // TTC command counters
    TtcCounterL1a,
    TtcCounterBc0,
    TtcCounterEc0,
    TtcCounterResync,
    TtcCounterOc0,
    TtcCounterHardReset,
    TtcCounterCalpulse,
    TtcCounterStart,
    TtcCounterStop,
    TtcCounterTestSync,

    TtcL1aId,
    TtcL1aRate,
}

const SCA_REPLY_PATHS: [&str; NUM_LINKS] = [
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH0.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH1.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH2.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH3.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH4.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH5.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH6.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH7.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH8.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH9.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH10.SCA_RPY_DATA",
    "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH11.SCA_RPY_DATA",
];

impl Register {
    /// Registers without a link index, in address table order.
    const FIXED: [Register; 45] = [
        Register::ScaLinkEnableMask,
        Register::ScaCmdChannel,
        Register::ScaCmdCommand,
        Register::ScaCmdLength,
        Register::ScaCmdData,
        Register::ScaCmdExecute,
        Register::ScaMonitoringOff,
        Register::ScaModuleReset,
        Register::ScaResetEnableMask,
        Register::ScaTtcHardResetEn,
        Register::TtcDisablePhaseAlignment,
        Register::TtcPaDisableGthPhaseTracking,
        Register::TtcPaManualOverride,
        Register::TtcPaManualShiftDir,
        Register::TtcPaGthManualOverride,
        Register::TtcPaGthManualShiftDir,
        Register::TtcPaGthManualShiftStep,
        Register::TtcPaGthManualSelOverride,
        Register::TtcPaGthManualCombined,
        Register::TtcGthTxDlyBypass,
        Register::TtcPaManualPllReset,
        Register::TtcPaGthManualShiftEn,
        Register::TtcCntReset,
        Register::TtcMmcmReset,
        Register::TtcL1aEnable,
        Register::TtcPaManualShiftCnt,
        Register::TtcPaManualGthShiftCnt,
        Register::TtcPmPhaseMean,
        Register::TtcGthPmPhaseMean,
        Register::TtcPhaseLocked,
        Register::TtcBc0Locked,
        Register::TtcSingleErrorCnt,
        Register::TtcDoubleErrorCnt,
        Register::TtcCounterL1a,
        Register::TtcCounterBc0,
        Register::TtcCounterEc0,
        Register::TtcCounterResync,
        Register::TtcCounterOc0,
        Register::TtcCounterHardReset,
        Register::TtcCounterCalpulse,
        Register::TtcCounterStart,
        Register::TtcCounterStop,
        Register::TtcCounterTestSync,
        Register::TtcL1aId,
        Register::TtcL1aRate,
    ];

    /// Iterates over every register, including the reply register of each link.
    pub fn all() -> impl Iterator<Item = Register> {
        Self::FIXED
            .into_iter()
            .chain(Link::all().map(Register::ScaReplyData))
    }

    /// The full dotted name of the register in the address table.
    pub const fn path(&self) -> &'static str {
        match self {
            Register::ScaLinkEnableMask => {
                "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.LINK_ENABLE_MASK"
            }
            Register::ScaCmdChannel => {
                "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_CMD.SCA_CMD_CHANNEL"
            }
            Register::ScaCmdCommand => {
                "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_CMD.SCA_CMD_COMMAND"
            }
            Register::ScaCmdLength => {
                "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_CMD.SCA_CMD_LENGTH"
            }
            Register::ScaCmdData => "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_CMD.SCA_CMD_DATA",
            Register::ScaCmdExecute => {
                "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_CMD.SCA_CMD_EXECUTE"
            }
            Register::ScaReplyData(link) => SCA_REPLY_PATHS[link.index()],
            Register::ScaMonitoringOff => "GEM_AMC.SLOW_CONTROL.SCA.ADC_MONITORING.MONITORING_OFF",
            Register::ScaModuleReset => "GEM_AMC.SLOW_CONTROL.SCA.CTRL.MODULE_RESET",
            Register::ScaResetEnableMask => "GEM_AMC.SLOW_CONTROL.SCA.CTRL.SCA_RESET_ENABLE_MASK",
            Register::ScaTtcHardResetEn => "GEM_AMC.SLOW_CONTROL.SCA.CTRL.TTC_HARD_RESET_EN",
            Register::TtcDisablePhaseAlignment => "GEM_AMC.TTC.CTRL.DISABLE_PHASE_ALIGNMENT",
            Register::TtcPaDisableGthPhaseTracking => {
                "GEM_AMC.TTC.CTRL.PA_DISABLE_GTH_PHASE_TRACKING"
            }
            Register::TtcPaManualOverride => "GEM_AMC.TTC.CTRL.PA_MANUAL_OVERRIDE",
            Register::TtcPaManualShiftDir => "GEM_AMC.TTC.CTRL.PA_MANUAL_SHIFT_DIR",
            Register::TtcPaGthManualOverride => "GEM_AMC.TTC.CTRL.PA_GTH_MANUAL_OVERRIDE",
            Register::TtcPaGthManualShiftDir => "GEM_AMC.TTC.CTRL.PA_GTH_MANUAL_SHIFT_DIR",
            Register::TtcPaGthManualShiftStep => "GEM_AMC.TTC.CTRL.PA_GTH_MANUAL_SHIFT_STEP",
            Register::TtcPaGthManualSelOverride => "GEM_AMC.TTC.CTRL.PA_GTH_MANUAL_SEL_OVERRIDE",
            Register::TtcPaGthManualCombined => "GEM_AMC.TTC.CTRL.PA_GTH_MANUAL_COMBINED",
            Register::TtcGthTxDlyBypass => "GEM_AMC.TTC.CTRL.GTH_TXDLYBYPASS",
            Register::TtcPaManualPllReset => "GEM_AMC.TTC.CTRL.PA_MANUAL_PLL_RESET",
            Register::TtcPaGthManualShiftEn => "GEM_AMC.TTC.CTRL.PA_GTH_MANUAL_SHIFT_EN",
            Register::TtcCntReset => "GEM_AMC.TTC.CTRL.CNT_RESET",
            Register::TtcMmcmReset => "GEM_AMC.TTC.CTRL.MMCM_RESET",
            Register::TtcL1aEnable => "GEM_AMC.TTC.CTRL.L1A_ENABLE",
            Register::TtcPaManualShiftCnt => "GEM_AMC.TTC.STATUS.CLK.PA_MANUAL_SHIFT_CNT",
            Register::TtcPaManualGthShiftCnt => "GEM_AMC.TTC.STATUS.CLK.PA_MANUAL_GTH_SHIFT_CNT",
            Register::TtcPmPhaseMean => "GEM_AMC.TTC.STATUS.CLK.TTC_PM_PHASE_MEAN",
            Register::TtcGthPmPhaseMean => "GEM_AMC.TTC.STATUS.CLK.GTH_PM_PHASE_MEAN",
            Register::TtcPhaseLocked => "GEM_AMC.TTC.STATUS.CLK.PHASE_LOCKED",
            Register::TtcBc0Locked => "GEM_AMC.TTC.STATUS.BC0.LOCKED",
            Register::TtcSingleErrorCnt => "GEM_AMC.TTC.STATUS.TTC_SINGLE_ERROR_CNT",
            Register::TtcDoubleErrorCnt => "GEM_AMC.TTC.STATUS.TTC_DOUBLE_ERROR_CNT",
            Register::TtcCounterL1a => "GEM_AMC.TTC.CMD_COUNTERS.L1A",
            Register::TtcCounterBc0 => "GEM_AMC.TTC.CMD_COUNTERS.BC0",
            Register::TtcCounterEc0 => "GEM_AMC.TTC.CMD_COUNTERS.EC0",
            Register::TtcCounterResync => "GEM_AMC.TTC.CMD_COUNTERS.RESYNC",
            Register::TtcCounterOc0 => "GEM_AMC.TTC.CMD_COUNTERS.OC0",
            Register::TtcCounterHardReset => "GEM_AMC.TTC.CMD_COUNTERS.HARD_RESET",
            Register::TtcCounterCalpulse => "GEM_AMC.TTC.CMD_COUNTERS.CALPULSE",
            Register::TtcCounterStart => "GEM_AMC.TTC.CMD_COUNTERS.START",
            Register::TtcCounterStop => "GEM_AMC.TTC.CMD_COUNTERS.STOP",
            Register::TtcCounterTestSync => "GEM_AMC.TTC.CMD_COUNTERS.TEST_SYNC",
            Register::TtcL1aId => "GEM_AMC.TTC.L1A_ID",
            Register::TtcL1aRate => "GEM_AMC.TTC.L1A_RATE",
        }
    }
}

impl Display for Register {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.path())
    }
}

#[cfg(test)]
mod test {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn paths_are_unique() {
        let paths: Vec<&str> = Register::all().map(|r| r.path()).collect();
        let unique: HashSet<&str> = paths.iter().copied().collect();
        assert_eq!(paths.len(), unique.len());
        assert_eq!(paths.len(), 45 + NUM_LINKS);
    }

    #[test]
    fn reply_paths_follow_link_index() {
        for link in Link::all() {
            let expected = format!(
                "GEM_AMC.SLOW_CONTROL.SCA.MANUAL_CONTROL.SCA_REPLY_OH{}.SCA_RPY_DATA",
                link.index()
            );
            assert_eq!(Register::ScaReplyData(link).path(), expected);
        }
    }

    #[test]
    fn every_path_is_in_amc_namespace() {
        assert!(Register::all().all(|r| r.path().starts_with("GEM_AMC.")));
    }
}
