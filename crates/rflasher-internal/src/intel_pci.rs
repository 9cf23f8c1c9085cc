//! Static table mapping Intel LPC/eSPI bridge PCI IDs to SPI controller generations
//!
//! Reference: flashprog/chipset_enable.c

use crate::chipset::{
    ChipsetEnable, IchChipset, TestStatus, B_FLS, B_LS, B_PFL, B_PFLS, B_S,
};

/// Intel PCI vendor ID
pub const INTEL_VID: u16 = 0x8086;

/// PCI IDs of Intel LPC/eSPI bridges (ISA bridge function, typically D31:F0) with a known SPI
/// controller generation. Not exhaustive; covers the generations this crate drives directly.
pub static CHIPSETS: &[ChipsetEnable] = &[
    ChipsetEnable::new(INTEL_VID, 0x2410, B_PFL, TestStatus::Ok, "Intel", "ICH", IchChipset::Ich),
    ChipsetEnable::new(INTEL_VID, 0x2420, B_PFL, TestStatus::Ok, "Intel", "ICH0", IchChipset::Ich),
    ChipsetEnable::new(INTEL_VID, 0x2440, B_PFL, TestStatus::Ok, "Intel", "ICH2", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x244c, B_PFL, TestStatus::Ok, "Intel", "ICH2-M", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x2480, B_PFL, TestStatus::Ok, "Intel", "ICH3-S", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x248c, B_PFL, TestStatus::Ok, "Intel", "ICH3-M", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x24c0, B_PFL, TestStatus::Ok, "Intel", "ICH4/ICH4-L", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x24cc, B_PFL, TestStatus::Ok, "Intel", "ICH4-M", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x24d0, B_PFL, TestStatus::Ok, "Intel", "ICH5/ICH5R", IchChipset::Ich2345),
    ChipsetEnable::new(INTEL_VID, 0x2640, B_PFLS, TestStatus::Ok, "Intel", "ICH6/ICH6R", IchChipset::Ich6),
    ChipsetEnable::new(INTEL_VID, 0x2641, B_PFLS, TestStatus::Ok, "Intel", "ICH6-M", IchChipset::Ich6),
    ChipsetEnable::new(INTEL_VID, 0x27b0, B_PFLS, TestStatus::Ok, "Intel", "ICH7DH", IchChipset::Ich7),
    ChipsetEnable::new(INTEL_VID, 0x27b8, B_PFLS, TestStatus::Ok, "Intel", "ICH7/ICH7R", IchChipset::Ich7),
    ChipsetEnable::new(INTEL_VID, 0x27b9, B_PFLS, TestStatus::Ok, "Intel", "ICH7M", IchChipset::Ich7),
    ChipsetEnable::new(INTEL_VID, 0x27bc, B_PFLS, TestStatus::Ok, "Intel", "NM10", IchChipset::Ich7),
    ChipsetEnable::new(INTEL_VID, 0x27bd, B_PFLS, TestStatus::Ok, "Intel", "ICH7MDH", IchChipset::Ich7),
    ChipsetEnable::new(INTEL_VID, 0x2810, B_FLS, TestStatus::Ok, "Intel", "ICH8/ICH8R", IchChipset::Ich8),
    ChipsetEnable::new(INTEL_VID, 0x2811, B_FLS, TestStatus::Ok, "Intel", "ICH8M-E", IchChipset::Ich8),
    ChipsetEnable::new(INTEL_VID, 0x2812, B_FLS, TestStatus::Ok, "Intel", "ICH8DH", IchChipset::Ich8),
    ChipsetEnable::new(INTEL_VID, 0x2814, B_FLS, TestStatus::Ok, "Intel", "ICH8DO", IchChipset::Ich8),
    ChipsetEnable::new(INTEL_VID, 0x2815, B_FLS, TestStatus::Ok, "Intel", "ICH8M", IchChipset::Ich8),
    ChipsetEnable::new(INTEL_VID, 0x2916, B_FLS, TestStatus::Ok, "Intel", "ICH9", IchChipset::Ich9),
    ChipsetEnable::new(INTEL_VID, 0x2917, B_FLS, TestStatus::Ok, "Intel", "ICH9R", IchChipset::Ich9),
    ChipsetEnable::new(INTEL_VID, 0x2918, B_FLS, TestStatus::Ok, "Intel", "ICH9DH", IchChipset::Ich9),
    ChipsetEnable::new(INTEL_VID, 0x2919, B_FLS, TestStatus::Ok, "Intel", "ICH9DO", IchChipset::Ich9),
    ChipsetEnable::new(INTEL_VID, 0x2b9c, B_FLS, TestStatus::Ok, "Intel", "PCH", IchChipset::Ich10),
    ChipsetEnable::new(INTEL_VID, 0x3b00, B_FLS, TestStatus::Ok, "Intel", "ICH10R", IchChipset::Ich10),
    ChipsetEnable::new(INTEL_VID, 0x3b02, B_FLS, TestStatus::Ok, "Intel", "ICH10D0", IchChipset::Ich10),
    ChipsetEnable::new(INTEL_VID, 0x3b06, B_FLS, TestStatus::Ok, "Intel", "ICH10", IchChipset::Ich10),
    ChipsetEnable::new(INTEL_VID, 0x3b09, B_FLS, TestStatus::Ok, "Intel", "PCH", IchChipset::Series5IbexPeak),
    ChipsetEnable::new(INTEL_VID, 0x1c44, B_LS, TestStatus::Ok, "Intel", "Z68", IchChipset::Series6CougarPoint),
    ChipsetEnable::new(INTEL_VID, 0x1c46, B_LS, TestStatus::Ok, "Intel", "P67", IchChipset::Series6CougarPoint),
    ChipsetEnable::new(INTEL_VID, 0x1c4a, B_LS, TestStatus::Ok, "Intel", "H67", IchChipset::Series6CougarPoint),
    ChipsetEnable::new(INTEL_VID, 0x1e44, B_LS, TestStatus::Ok, "Intel", "Z77", IchChipset::Series7PantherPoint),
    ChipsetEnable::new(INTEL_VID, 0x1e47, B_LS, TestStatus::Ok, "Intel", "Q77", IchChipset::Series7PantherPoint),
    ChipsetEnable::new(INTEL_VID, 0x1e4a, B_LS, TestStatus::Ok, "Intel", "H77", IchChipset::Series7PantherPoint),
    ChipsetEnable::new(INTEL_VID, 0x8c44, B_LS, TestStatus::Ok, "Intel", "Z87", IchChipset::Series8LynxPoint),
    ChipsetEnable::new(INTEL_VID, 0x8c4a, B_LS, TestStatus::Ok, "Intel", "H87", IchChipset::Series8LynxPoint),
    ChipsetEnable::new(INTEL_VID, 0x8cc4, B_LS, TestStatus::Ok, "Intel", "Z97", IchChipset::Series9WildcatPoint),
    ChipsetEnable::new(INTEL_VID, 0xa145, B_LS, TestStatus::Ok, "Intel", "H110", IchChipset::Series100SunrisePoint),
    ChipsetEnable::new(INTEL_VID, 0xa144, B_LS, TestStatus::Ok, "Intel", "B150", IchChipset::Series100SunrisePoint),
    ChipsetEnable::new(INTEL_VID, 0xa2c5, B_LS, TestStatus::Ok, "Intel", "Z270", IchChipset::Series100SunrisePoint),
    ChipsetEnable::new(INTEL_VID, 0xa2c9, B_LS, TestStatus::Untested, "Intel", "H270", IchChipset::Series100SunrisePoint),
    ChipsetEnable::new(INTEL_VID, 0xa282, B_S, TestStatus::Ok, "Intel", "C621 (Lewisburg)", IchChipset::C620Lewisburg),
    ChipsetEnable::new(INTEL_VID, 0xa305, B_LS, TestStatus::Ok, "Intel", "Z390", IchChipset::Series300CannonPoint),
    ChipsetEnable::new(INTEL_VID, 0xa309, B_LS, TestStatus::Untested, "Intel", "H310", IchChipset::Series300CannonPoint),
    ChipsetEnable::new(INTEL_VID, 0x5ae8, B_S, TestStatus::Ok, "Intel", "Apollo Lake", IchChipset::ApolloLake),
    ChipsetEnable::new(INTEL_VID, 0x31e8, B_S, TestStatus::Untested, "Intel", "Gemini Lake", IchChipset::GeminiLake),
    ChipsetEnable::new(INTEL_VID, 0x06a1, B_S, TestStatus::Untested, "Intel", "Z490", IchChipset::Series500TigerPoint),
];

/// Look up a chipset enable entry by vendor/device/revision
pub fn find_chipset(vendor_id: u16, device_id: u16, revision_id: Option<u8>) -> Option<&'static ChipsetEnable> {
    CHIPSETS.iter().find(|c| {
        c.vendor_id == vendor_id
            && c.device_id == device_id
            && match (c.revision, revision_id) {
                (Some(want), Some(got)) => want == got,
                (Some(_), None) => false,
                (None, _) => true,
            }
    })
}
