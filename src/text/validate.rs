//! Validators for sensitive data types
//!
//! All validators accept a candidate as it appears in text: full-width
//! digits and invisible characters are normalized, and single separators
//! (space, hyphen, dot) between digits are collapsed before checking.

use super::normalize::{fold_fullwidth_digit, is_invisible};
use chrono::{Datelike, NaiveDate};
use regex::Regex;
use std::sync::OnceLock;

/// Weights applied to the first 17 digits of an 18-digit ID.
pub const ID_CHECKSUM_WEIGHTS: [u32; 17] = [7, 9, 10, 5, 8, 4, 2, 1, 6, 3, 7, 9, 10, 5, 8, 4, 2];

/// Checksum character indexed by the weighted sum mod 11.
pub const ID_CHECKSUM_TABLE: &[u8; 11] = b"10X98765432";

/// First two digits of a mainland resident ID (province codes).
const PROVINCE_CODES: &[u32] = &[
    11, 12, 13, 14, 15, 21, 22, 23, 31, 32, 33, 34, 35, 36, 37, 41, 42, 43, 44, 45, 46, 50, 51, 52,
    53, 54, 61, 62, 63, 64, 65, 71, 81, 82, 91,
];

/// Published test card numbers that must never be treated as real cards.
const TEST_CARD_NUMBERS: &[&str] = &[
    "4111111111111111",
    "4012888888881881",
    "4222222222222",
    "4242424242424242",
    "4000056655665556",
    "5555555555554444",
    "5105105105105100",
    "2223003122003222",
    "378282246310005",
    "371449635398431",
    "378734493671000",
    "6011111111111117",
    "6011000990139424",
    "3530111333300000",
    "3566002020360505",
    "30569309025904",
    "38520000023237",
    "6200000000000005",
];

/// Collapse a candidate to its digits.
///
/// Returns `None` if the candidate contains anything other than digits,
/// invisible chars and single space/hyphen/dot separators between digits.
/// A trailing `X`/`x` is kept (as `X`) for ID candidates.
pub fn collapse_digits(candidate: &str) -> Option<String> {
    let mut out = String::with_capacity(candidate.len());
    let mut pending_separator = false;
    let mut seen_x = false;

    for c in candidate.trim().chars() {
        if is_invisible(c) {
            continue;
        }
        if seen_x {
            return None;
        }
        let digit = if c.is_ascii_digit() {
            Some(c)
        } else {
            fold_fullwidth_digit(c)
        };
        match digit {
            Some(d) => {
                out.push(d);
                pending_separator = false;
            }
            None if c == 'X' || c == 'x' => {
                if out.is_empty() {
                    return None;
                }
                out.push('X');
                seen_x = true;
            }
            None if matches!(c, ' ' | '-' | '.') => {
                if out.is_empty() || pending_separator {
                    return None;
                }
                pending_separator = true;
            }
            None => return None,
        }
    }

    if out.is_empty() || pending_separator {
        None
    } else {
        Some(out)
    }
}

/// Luhn checksum over an all-digit string.
pub fn luhn_valid(digits: &str) -> bool {
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let sum: u32 = digits
        .bytes()
        .rev()
        .enumerate()
        .map(|(i, b)| {
            let d = u32::from(b - b'0');
            if i % 2 == 1 {
                let doubled = d * 2;
                if doubled > 9 {
                    doubled - 9
                } else {
                    doubled
                }
            } else {
                d
            }
        })
        .sum();
    sum % 10 == 0
}

/// All digits are the same.
pub fn is_all_identical(digits: &str) -> bool {
    let mut bytes = digits.bytes();
    match bytes.next() {
        Some(first) => bytes.all(|b| b == first),
        None => false,
    }
}

/// Digits ascend or descend by one throughout (wrapping 9 to 0).
pub fn is_sequential(digits: &str) -> bool {
    let bytes: Vec<u8> = digits.bytes().collect();
    if bytes.len() < 2 {
        return false;
    }
    let step = |a: u8, b: u8, dir: i8| -> bool {
        let next = (i16::from(a - b'0') + i16::from(dir)).rem_euclid(10);
        i16::from(b - b'0') == next
    };
    bytes.windows(2).all(|w| step(w[0], w[1], 1)) || bytes.windows(2).all(|w| step(w[0], w[1], -1))
}

/// Known public test card number.
pub fn is_test_card_number(digits: &str) -> bool {
    TEST_CARD_NUMBERS.contains(&digits)
}

// =============================================================================
// Type validators
// =============================================================================

/// Mainland mobile number: 11 digits, `1`, then 3..9.
pub fn is_valid_phone(candidate: &str) -> bool {
    match collapse_digits(candidate) {
        Some(d) => is_valid_phone_digits(&d),
        None => false,
    }
}

/// Phone check over already-collapsed digits.
pub fn is_valid_phone_digits(digits: &str) -> bool {
    let b = digits.as_bytes();
    b.len() == 11
        && b.iter().all(|c| c.is_ascii_digit())
        && b[0] == b'1'
        && (b'3'..=b'9').contains(&b[1])
        && !is_all_identical(digits)
}

/// Bank card: 13..19 digits, Luhn valid, not a test or trivial number.
pub fn is_valid_bank_card(candidate: &str) -> bool {
    match collapse_digits(candidate) {
        Some(d) => is_valid_bank_card_digits(&d),
        None => false,
    }
}

/// Bank card check over already-collapsed digits.
pub fn is_valid_bank_card_digits(digits: &str) -> bool {
    (13..=19).contains(&digits.len())
        && luhn_valid(digits)
        && !is_test_card_number(digits)
        && !is_all_identical(digits)
        && !is_sequential(digits)
}

/// Chinese resident ID, 18-digit with checksum or 15-digit legacy.
pub fn is_valid_id_card(candidate: &str) -> bool {
    match collapse_digits(candidate) {
        Some(d) => is_valid_id_card_digits(&d, true),
        None => false,
    }
}

/// ID check over collapsed digits; `checksum` toggles the 18-digit check.
pub fn is_valid_id_card_digits(id: &str, checksum: bool) -> bool {
    if !id_card_structure_valid(id) {
        return false;
    }
    if id.len() == 18 && checksum {
        return id_checksum_char(&id[..17]) == id.as_bytes()[17].to_ascii_uppercase();
    }
    true
}

/// Region prefix, length, charset and embedded birth date are valid.
pub fn id_card_structure_valid(id: &str) -> bool {
    let b = id.as_bytes();
    let digits_ok = match b.len() {
        18 => {
            b[..17].iter().all(|c| c.is_ascii_digit())
                && (b[17].is_ascii_digit() || b[17] == b'X' || b[17] == b'x')
        }
        15 => b.iter().all(|c| c.is_ascii_digit()),
        _ => false,
    };
    if !digits_ok {
        return false;
    }
    let province = u32::from(b[0] - b'0') * 10 + u32::from(b[1] - b'0');
    if !PROVINCE_CODES.contains(&province) {
        return false;
    }
    if b.len() == 18 {
        is_valid_birth_date(&id[6..14])
    } else {
        // legacy IDs carry a two-digit year in the 1900s
        is_valid_birth_date(&format!("19{}", &id[6..12]))
    }
}

/// Compute the checksum character for the first 17 digits of an ID.
pub fn id_checksum_char(first17: &str) -> u8 {
    let sum: u32 = first17
        .bytes()
        .zip(ID_CHECKSUM_WEIGHTS.iter())
        .map(|(b, w)| u32::from(b.wrapping_sub(b'0')) * w)
        .sum();
    ID_CHECKSUM_TABLE[(sum % 11) as usize]
}

/// `YYYYMMDD`, calendar valid (leap-year aware), year in 1900..=2100.
pub fn is_valid_birth_date(yyyymmdd: &str) -> bool {
    if yyyymmdd.len() != 8 || !yyyymmdd.bytes().all(|b| b.is_ascii_digit()) {
        return false;
    }
    let (Ok(year), Ok(month), Ok(day)) = (
        yyyymmdd[0..4].parse::<i32>(),
        yyyymmdd[4..6].parse::<u32>(),
        yyyymmdd[6..8].parse::<u32>(),
    ) else {
        return false;
    };
    match NaiveDate::from_ymd_opt(year, month, day) {
        Some(date) => (1900..=2100).contains(&date.year()),
        None => false,
    }
}

static EMAIL: OnceLock<Option<Regex>> = OnceLock::new();

/// Email address (local part may already contain `*` from masking).
pub fn is_valid_email(candidate: &str) -> bool {
    let Some(re) = super::compiled(
        &EMAIL,
        r"^[A-Za-z0-9*][A-Za-z0-9._%+\-*]{0,63}@[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?(?:\.[A-Za-z0-9](?:[A-Za-z0-9\-]*[A-Za-z0-9])?)*\.[A-Za-z]{2,}$",
    ) else {
        return false;
    };
    let normalized = super::normalize::normalize(candidate.trim());
    re.is_match(&normalized) && !normalized.contains("..")
}

// =============================================================================
// Chinese names
// =============================================================================

const COMPOUND_SURNAMES: &[&str] = &[
    "欧阳", "司马", "上官", "诸葛", "东方", "皇甫", "尉迟", "公孙", "慕容", "长孙", "宇文", "司徒",
    "夏侯", "轩辕", "令狐", "端木", "独孤", "南宫", "西门", "百里", "呼延", "万俟", "澹台", "公冶",
];

const SURNAMES: &str = "王李张刘陈杨黄赵吴周徐孙马朱胡郭何高林罗郑梁谢宋唐许韩冯邓曹彭曾肖田董袁潘于蒋蔡余杜叶程苏魏吕丁任沈姚卢姜崔钟谭陆汪范金石廖贾夏韦付方白邹孟熊秦邱江尹薛闫段雷侯龙史陶黎贺顾毛郝龚邵万钱严覃武戴莫孔向汤常温康施文牛樊葛邢安齐易乔伍庞颜倪庄聂章鲁岳翟殷詹申欧耿关兰焦俞左柳甘祝包宁尚符舒阮柯纪梅童凌毕单季裴霍涂成苗谷盛曲翁冉骆蓝路游辛靳管柴蒙鲍华喻祁蒲房滕屈饶解牟艾尤阳时穆农司卓古吉缪简车项连芦麦褚娄窦戚岑景党宫费卜冷晏席卫米柏宗瞿桂全佟应臧闵苟邬边卞姬师和仇栾隋商刁沙荣巫寇桑郎甄丛仲虞敖巩明佘池查麻苑迟邝官封谈匡鞠惠荆乐冀郁胥南班储原栗燕楚鄢劳谌奚皮粟冼蔺楼盘满闻位厉伊仝区郜海阚花权强帅屠豆朴盖练廉禹井祖漆巴丰支卿国狄平计索宣晋相初门云容敬来扈晁芮都普阙浦戈伏鹿薄邸雍辜羊乌母裘亓修邰赫杭况那宿鲜印逯隆茹诸战慕危玉银亢嵇公哈湛宾戎勾茅利於呼居揭干但尉冶斯元束檀衣信展阴昝智幸奉植衡富尧闭由";

/// CJK unified ideograph.
pub fn is_han(c: char) -> bool {
    ('\u{4E00}'..='\u{9FFF}').contains(&c) || ('\u{3400}'..='\u{4DBF}').contains(&c)
}

/// Length of the surname prefix of `name` in chars, if it starts with one.
pub fn surname_len(name: &str) -> Option<usize> {
    if COMPOUND_SURNAMES.iter().any(|s| name.starts_with(s)) {
        return Some(2);
    }
    let first = name.chars().next()?;
    SURNAMES.contains(first).then_some(1)
}

/// Two to four Han characters starting with a known surname.
pub fn is_chinese_name(candidate: &str) -> bool {
    let name = candidate.trim();
    let chars: Vec<char> = name.chars().collect();
    if !(2..=4).contains(&chars.len()) || !chars.iter().all(|c| is_han(*c)) {
        return false;
    }
    match surname_len(name) {
        Some(len) => chars.len() > len,
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ---- collapse ----

    #[test]
    fn test_collapse_digits() {
        assert_eq!(collapse_digits("138-1234-5678").as_deref(), Some("13812345678"));
        assert_eq!(collapse_digits("１３８ 1234").as_deref(), Some("1381234"));
        assert_eq!(collapse_digits("138\u{200B}1234").as_deref(), Some("1381234"));
        assert!(collapse_digits("138--1234").is_none());
        assert!(collapse_digits("abc").is_none());
        assert!(collapse_digits("-138").is_none());
        assert!(collapse_digits("12X3").is_none());
    }

    // ---- luhn ----

    #[test]
    fn test_luhn() {
        assert!(luhn_valid("79927398713"));
        assert!(!luhn_valid("79927398710"));
        assert!(!luhn_valid(""));
        assert!(!luhn_valid("12a4"));
    }

    #[test]
    fn test_sequential_and_identical() {
        assert!(is_sequential("1234567890123"));
        assert!(is_sequential("9876543210987"));
        assert!(!is_sequential("1234567890124"));
        assert!(is_all_identical("0000000000000"));
        assert!(!is_all_identical("0000000000001"));
    }

    // ---- phone ----

    #[test]
    fn test_phone_validation() {
        assert!(is_valid_phone("13812345678"));
        assert!(is_valid_phone("138 1234 5678"));
        assert!(is_valid_phone("１３８１２３４５６７８"));
        assert!(!is_valid_phone("12812345678"));
        assert!(!is_valid_phone("1381234567"));
        assert!(!is_valid_phone("11111111111"));
        assert!(!is_valid_phone("23812345678"));
    }

    // ---- bank card ----

    #[test]
    fn test_bank_card_validation() {
        assert!(is_valid_bank_card("6222600260001072444"));
        assert!(is_valid_bank_card("6222 6002 6000 1072 444"));
        assert!(is_valid_bank_card("6225880137654324"));
        assert!(!is_valid_bank_card("6222600260001072445"));
        assert!(!is_valid_bank_card("4111111111111111"));
        assert!(!is_valid_bank_card("123456789012"));
    }

    // ---- id card ----

    #[test]
    fn test_id_checksum() {
        assert_eq!(id_checksum_char("11010519491231002"), b'X');
        assert!(is_valid_id_card("11010519491231002X"));
        assert!(is_valid_id_card("11010519491231002x"));
        assert!(!is_valid_id_card("110105194912310021"));
    }

    #[test]
    fn test_id_structure_without_checksum() {
        assert!(is_valid_id_card("110101199003079876"));
        // checksum mismatch, structure still valid
        assert!(!is_valid_id_card("110101199003079875"));
        assert!(is_valid_id_card_digits("110101199003079875", false));
        assert!(!is_valid_id_card_digits("990101199003079876", false));
        assert!(!is_valid_id_card_digits("110101199002309876", false));
    }

    #[test]
    fn test_legacy_id() {
        assert!(is_valid_id_card("110105491231002"));
        assert!(!is_valid_id_card("110105491331002"));
    }

    #[test]
    fn test_birth_date() {
        assert!(is_valid_birth_date("20000229"));
        assert!(!is_valid_birth_date("19000229"));
        assert!(!is_valid_birth_date("18991231"));
        assert!(is_valid_birth_date("21001231"));
        assert!(!is_valid_birth_date("21010101"));
        assert!(!is_valid_birth_date("2000013"));
    }

    // ---- email ----

    #[test]
    fn test_email_validation() {
        assert!(is_valid_email("test@example.com"));
        assert!(is_valid_email("t**t@example.com"));
        assert!(is_valid_email("first.last+tag@mail.example.org"));
        assert!(!is_valid_email("test@"));
        assert!(!is_valid_email("test@example"));
        assert!(!is_valid_email("a..b@example.com"));
        assert!(!is_valid_email("hello world"));
    }

    // ---- names ----

    #[test]
    fn test_chinese_name() {
        assert!(is_chinese_name("张三"));
        assert!(is_chinese_name("王小明"));
        assert!(is_chinese_name("欧阳娜娜"));
        assert!(!is_chinese_name("欧阳"));
        assert!(!is_chinese_name("张"));
        assert!(!is_chinese_name("你好世界啊"));
        assert!(!is_chinese_name("Zhang"));
    }
}
