//! USB identity, request-type and encoder register constants.

/// USB Vendor ID of the motor/encoder board.
pub const VENDOR_ID: u16 = 0x6666;

/// USB Product ID of the motor/encoder board.
pub const PRODUCT_ID: u16 = 0x0003;

/// Configuration selected after the device is opened.
pub const DEFAULT_CONFIGURATION: u8 = 1;

/// Interface claimed for control transfers.
pub const DEFAULT_INTERFACE: u8 = 0;

/// `bmRequestType` for vendor device-to-host requests.
pub const VENDOR_REQUEST_IN: u8 = 0xC0;

/// `bmRequestType` for vendor host-to-device requests.
pub const VENDOR_REQUEST_OUT: u8 = 0x40;

/// AS5048A magnetic encoder register map, as exposed through the
/// register-read vendor request.
pub mod as5048a {
    pub const NOP: u16 = 0x0000;
    pub const CLEAR_ERROR_FLAG: u16 = 0x0001;
    pub const PROGRAMMING_CTRL: u16 = 0x0003;
    pub const OTP_ZERO_POS_HI: u16 = 0x0016;
    pub const OTP_ZERO_POS_LO: u16 = 0x0017;
    pub const DIAG_AND_AUTO_GAIN_CTRL: u16 = 0x3FFD;
    pub const MAGNITUDE: u16 = 0x3FFE;
    pub const ANGLE: u16 = 0x3FFF;

    /// Clears the parity and error-flag bits of a register word.
    pub const DATA_MASK: u16 = 0x3FFF;

    const REGISTERS: [(&str, u16); 8] = [
        ("nop", NOP),
        ("clear_error_flag", CLEAR_ERROR_FLAG),
        ("programming_ctrl", PROGRAMMING_CTRL),
        ("otp_zero_pos_hi", OTP_ZERO_POS_HI),
        ("otp_zero_pos_lo", OTP_ZERO_POS_LO),
        ("diag_and_auto_gain_ctrl", DIAG_AND_AUTO_GAIN_CTRL),
        ("magnitude", MAGNITUDE),
        ("angle", ANGLE),
    ];

    /// Look up a register address by its (case-insensitive) name.
    pub fn register_by_name(name: &str) -> Option<u16> {
        let name = name.to_ascii_lowercase();
        REGISTERS
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, addr)| *addr)
    }

    /// Name of a known register address.
    pub fn register_name(address: u16) -> Option<&'static str> {
        REGISTERS
            .iter()
            .find(|(_, addr)| *addr == address)
            .map(|(n, _)| *n)
    }

    /// All known registers in address order.
    pub fn registers() -> impl Iterator<Item = (&'static str, u16)> {
        REGISTERS.into_iter()
    }
}
