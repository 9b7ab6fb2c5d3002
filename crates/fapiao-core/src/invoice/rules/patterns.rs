//! Common regex patterns for Chinese VAT invoice extraction.
//!
//! Labelled patterns accept both the ASCII `:` and the full-width `：`
//! separator, and OCR-inserted whitespace around it.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // Invoice identity
    pub static ref INVOICE_CODE: Regex = Regex::new(
        r"发票代码\s*[:：]\s*(\d+)"
    ).unwrap();

    pub static ref INVOICE_NUMBER: Regex = Regex::new(
        r"发票号码\s*[:：]\s*(\d+)"
    ).unwrap();

    // Dates: 2024-01-05, 2024/1/5, 2024.01.05, 2024年1月5日
    pub static ref ISSUE_DATE: Regex = Regex::new(
        r"开票日期\s*[:：]\s*(\d{4}\s*[-/.年]\s*\d{1,2}\s*[-/.月]\s*\d{1,2}\s*日?)"
    ).unwrap();

    pub static ref LABELED_DATE: Regex = Regex::new(
        r"日期\s*[:：]\s*(\d{4}\s*[-/.年]\s*\d{1,2}\s*[-/.月]\s*\d{1,2}\s*日?)"
    ).unwrap();

    pub static ref DATE_YMD: Regex = Regex::new(
        r"^(\d{4})\s*[-/.年]\s*(\d{1,2})\s*[-/.月]\s*(\d{1,2})\s*日?$"
    ).unwrap();

    pub static ref DATE_COMPACT: Regex = Regex::new(
        r"^(\d{4})(\d{2})(\d{2})$"
    ).unwrap();

    // Amounts: 100.00, ¥1,234.50
    pub static ref AMOUNT: Regex = Regex::new(
        r"金额\s*[:：]\s*[¥￥]?\s*(\d+(?:,\d{3})*\.\d+)"
    ).unwrap();

    pub static ref TAX_AMOUNT: Regex = Regex::new(
        r"税额\s*[:：]\s*[¥￥]?\s*(\d+(?:,\d{3})*\.\d+)"
    ).unwrap();

    pub static ref TOTAL_AMOUNT: Regex = Regex::new(
        r"价税合计\s*(?:[（(]\s*小写\s*[)）])?\s*[:：]?\s*[¥￥]?\s*(\d+(?:,\d{3})*\.\d+)"
    ).unwrap();

    // "价税合计（大写）壹佰壹拾叁圆整（小写）¥113.00"
    pub static ref TOTAL_AMOUNT_LOWERCASE: Regex = Regex::new(
        r"[（(]\s*小写\s*[)）]\s*[:：]?\s*[¥￥]?\s*(\d+(?:,\d{3})*\.\d+)"
    ).unwrap();

    // Party sections and their lines
    pub static ref BUYER_SECTION: Regex = Regex::new(
        r"购买方|购方|购货单位"
    ).unwrap();

    pub static ref SELLER_SECTION: Regex = Regex::new(
        r"销售方|销方|销货单位"
    ).unwrap();

    pub static ref PARTY_NAME: Regex = Regex::new(
        r"(?m)名\s*称\s*[:：]\s*(\S[^\n]*?)\s*$"
    ).unwrap();

    pub static ref PARTY_TAX_ID: Regex = Regex::new(
        r"(?:纳税人识别号|统一社会信用代码(?:/纳税人识别号)?)\s*[:：]\s*([0-9A-Z]{15,20})"
    ).unwrap();

    // data:image/png;base64,
    pub static ref DATA_URI_PREFIX: Regex = Regex::new(
        r"^data:[^;,]*(?:;[^,]*)?,"
    ).unwrap();
}
