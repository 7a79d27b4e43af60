use crate::config::Settings;
use crate::domain::stock::{HistoryPoint, StockSnapshot};
use crate::market::StockDataSource;
use anyhow::Context;
use chrono::{DateTime, Datelike, Duration as ChronoDuration, NaiveDate, Utc};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::time::Duration;

const DEFAULT_LIST_LATENCY: Duration = Duration::from_millis(500);
const DEFAULT_HISTORY_LATENCY: Duration = Duration::from_millis(300);

const ICT_OFFSET_SECS: i32 = 7 * 3600;
const HISTORY_DAYS: i64 = 90;
const UNKNOWN_SYMBOL_PRICE: f64 = 100.0;

const THAI_MONTHS_SHORT: [&str; 12] = [
    "ม.ค.", "ก.พ.", "มี.ค.", "เม.ย.", "พ.ค.", "มิ.ย.", "ก.ค.", "ส.ค.", "ก.ย.", "ต.ค.", "พ.ย.",
    "ธ.ค.",
];

/// In-memory SET listing with simulated latency and a random-walk price history.
#[derive(Debug, Clone)]
pub struct MockStockDataSource {
    stocks: Vec<StockSnapshot>,
    list_latency: Duration,
    history_latency: Duration,
    seed: Option<u64>,
}

impl Default for MockStockDataSource {
    fn default() -> Self {
        Self {
            stocks: fixture_stocks(),
            list_latency: DEFAULT_LIST_LATENCY,
            history_latency: DEFAULT_HISTORY_LATENCY,
            seed: None,
        }
    }
}

impl MockStockDataSource {
    pub fn from_settings(settings: &Settings) -> Self {
        let out = Self::default();
        match settings.mock_latency() {
            Some(latency) => out.with_latency(latency, latency),
            None => out,
        }
    }

    pub fn with_latency(mut self, list: Duration, history: Duration) -> Self {
        self.list_latency = list;
        self.history_latency = history;
        self
    }

    pub fn without_latency(self) -> Self {
        self.with_latency(Duration::ZERO, Duration::ZERO)
    }

    /// Fixes the RNG so every history call returns the same series.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    fn rng(&self) -> StdRng {
        match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_rng(&mut rand::rng()),
        }
    }

    fn current_price(&self, symbol: &str) -> f64 {
        self.stocks
            .iter()
            .find(|s| s.symbol.eq_ignore_ascii_case(symbol.trim()))
            .map(|s| s.price)
            .unwrap_or(UNKNOWN_SYMBOL_PRICE)
    }
}

async fn simulate_latency(latency: Duration) {
    if !latency.is_zero() {
        tokio::time::sleep(latency).await;
    }
}

#[async_trait::async_trait]
impl StockDataSource for MockStockDataSource {
    fn source_name(&self) -> &'static str {
        "mock"
    }

    async fn list_stocks(&self) -> anyhow::Result<Vec<StockSnapshot>> {
        simulate_latency(self.list_latency).await;
        Ok(self.stocks.clone())
    }

    async fn get_history(&self, symbol: &str) -> anyhow::Result<Vec<HistoryPoint>> {
        let today = today_ict(Utc::now())?;
        let history = random_walk(self.current_price(symbol), today, &mut self.rng());
        simulate_latency(self.history_latency).await;
        Ok(history)
    }
}

fn today_ict(now_utc: DateTime<Utc>) -> anyhow::Result<NaiveDate> {
    let ict = chrono::FixedOffset::east_opt(ICT_OFFSET_SECS).context("invalid ICT offset")?;
    Ok(now_utc.with_timezone(&ict).date_naive())
}

/// `HISTORY_DAYS + 1` daily points ending on `today`, starting at 85% of `current_price` with a
/// slight upward drift, pulled toward `current_price` over the last five days.
pub fn random_walk(current_price: f64, today: NaiveDate, rng: &mut impl Rng) -> Vec<HistoryPoint> {
    let mut price = current_price * 0.85;
    let mut out = Vec::with_capacity(HISTORY_DAYS as usize + 1);

    for days_back in (0..=HISTORY_DAYS).rev() {
        let date = today - ChronoDuration::days(days_back);

        price += (rng.random::<f64>() - 0.48) * (current_price * 0.05);
        if days_back < 5 {
            price = price * 0.9 + current_price * 0.1;
        }

        out.push(HistoryPoint {
            date: thai_short_date(date),
            price: (price * 100.0).round() / 100.0,
        });
    }

    out
}

/// "16 ต.ค." style label.
pub fn thai_short_date(date: NaiveDate) -> String {
    format!("{} {}", date.day(), THAI_MONTHS_SHORT[date.month0() as usize])
}

pub fn fixture_stocks() -> Vec<StockSnapshot> {
    #[allow(clippy::too_many_arguments)]
    fn stock(
        symbol: &str,
        name: &str,
        sector: &str,
        (price, change, change_percent): (f64, f64, f64),
        (pe, pbv, dividend_yield): (f64, f64, f64),
        (market_cap, volume): (&str, &str),
        rsi: f64,
        description: &str,
        latest_news: &str,
    ) -> StockSnapshot {
        StockSnapshot {
            symbol: symbol.to_string(),
            name: name.to_string(),
            sector: sector.to_string(),
            price,
            change,
            change_percent,
            pe,
            pbv,
            dividend_yield,
            market_cap: market_cap.to_string(),
            volume: volume.to_string(),
            rsi,
            description: description.to_string(),
            latest_news: latest_news.to_string(),
        }
    }

    vec![
        stock(
            "PTT",
            "PTT Public Company Limited",
            "Energy",
            (34.50, -0.25, -0.72),
            (8.5, 0.85, 5.8),
            ("985B", "45M"),
            42.0,
            "บริษัทพลังงานแห่งชาติ ดำเนินธุรกิจก๊าซธรรมชาติ น้ำมัน และปิโตรเคมีครบวงจร",
            "ราคาน้ำมันดิบโลกผันผวน ส่งผลกระทบต่อกำไรระยะสั้น แต่โครงการพลังงานสะอาดเริ่มเห็นผล",
        ),
        stock(
            "AOT",
            "Airports of Thailand",
            "Transportation",
            (63.25, 1.25, 2.02),
            (45.2, 5.2, 1.2),
            ("903B", "22M"),
            65.0,
            "ผู้บริหารท่าอากาศยานหลักของประเทศไทย รวมถึงสุวรรณภูมิและดอนเมือง",
            "จำนวนนักท่องเที่ยวจีนฟื้นตัวเร็วกว่าคาด หนุนรายได้ค่าธรรมเนียมสนามบิน",
        ),
        stock(
            "KBANK",
            "Kasikornbank",
            "Banking",
            (124.00, 0.00, 0.00),
            (7.8, 0.65, 4.5),
            ("294B", "12M"),
            55.0,
            "ธนาคารพาณิชย์ชั้นนำ เน้นบริการดิจิทัลแบงก์กิ้งและสินเชื่อ SME",
            "ประกาศแผนยุทธศาสตร์ Net Zero และการปล่อยสินเชื่อสีเขียวเพิ่มขึ้น",
        ),
        stock(
            "DELTA",
            "Delta Electronics (Thailand)",
            "Electronics",
            (78.50, -2.50, -3.09),
            (65.4, 12.5, 0.5),
            ("980B", "8M"),
            78.0,
            "ผู้ผลิตชิ้นส่วนอิเล็กทรอนิกส์และ Power Supply ชั้นนำระดับโลก สำหรับ EV และ Data Center",
            "ความต้องการชิ้นส่วนสำหรับ Data Center AI พุ่งสูง แต่ราคาหุ้นเริ่มตึงตัว",
        ),
        stock(
            "CPALL",
            "CP ALL Public Company",
            "Commerce",
            (56.75, 0.50, 0.89),
            (28.5, 4.1, 2.1),
            ("510B", "30M"),
            48.0,
            "ผู้บริหารร้านสะดวกซื้อ 7-Eleven ในประเทศไทย และธุรกิจค้าส่ง",
            "ยอดขายสาขาเดิม (SSSG) เติบโตต่อเนื่องจากการท่องเที่ยวและการบริโภคในประเทศ",
        ),
        stock(
            "ADVANC",
            "Advanced Info Service",
            "ICT",
            (205.00, 3.00, 1.49),
            (22.1, 7.5, 3.8),
            ("610B", "5M"),
            62.0,
            "ผู้นำเครือข่ายโทรศัพท์เคลื่อนที่และบริการดิจิทัลในไทย",
            "การควบรวมกิจการคู่แข่งช่วยลดการแข่งขันด้านราคา หนุนกำไรระยะยาว",
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn random_walk_has_91_points_ending_on_today() {
        let today = NaiveDate::from_ymd_opt(2026, 10, 16).unwrap();
        let mut rng = StdRng::seed_from_u64(7);
        let points = random_walk(34.5, today, &mut rng);

        assert_eq!(points.len(), 91);
        assert_eq!(points.last().unwrap().date, "16 ต.ค.");
        // 90 days before 2026-10-16.
        assert_eq!(points.first().unwrap().date, "18 ก.ค.");
    }

    #[test]
    fn random_walk_prices_are_rounded_and_stay_near_current() {
        let today = NaiveDate::from_ymd_opt(2026, 1, 5).unwrap();
        for seed in 0..20 {
            let mut rng = StdRng::seed_from_u64(seed);
            let points = random_walk(124.0, today, &mut rng);
            for p in &points {
                assert_eq!((p.price * 100.0).round() / 100.0, p.price);
            }
            let last = points.last().unwrap().price;
            assert!(last > 0.0 && last < 124.0 * 4.0, "seed {seed}: {last}");
        }
    }

    #[test]
    fn seeded_walk_is_reproducible() {
        let today = NaiveDate::from_ymd_opt(2026, 3, 1).unwrap();
        let a = random_walk(78.5, today, &mut StdRng::seed_from_u64(42));
        let b = random_walk(78.5, today, &mut StdRng::seed_from_u64(42));
        assert_eq!(a, b);
    }

    #[test]
    fn today_uses_bangkok_date() {
        // 2026-01-04 20:00 UTC is already 2026-01-05 in Bangkok.
        let now = Utc.with_ymd_and_hms(2026, 1, 4, 20, 0, 0).unwrap();
        assert_eq!(today_ict(now).unwrap(), NaiveDate::from_ymd_opt(2026, 1, 5).unwrap());
    }

    #[tokio::test]
    async fn lists_the_six_set_stocks_in_order() {
        let source = MockStockDataSource::default().without_latency();
        let symbols: Vec<String> = source
            .list_stocks()
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.symbol)
            .collect();
        assert_eq!(symbols, ["PTT", "AOT", "KBANK", "DELTA", "CPALL", "ADVANC"]);
    }

    #[tokio::test]
    async fn find_stock_is_case_insensitive() {
        let source = MockStockDataSource::default().without_latency();
        let stock = source.find_stock(" kbank ").await.unwrap().unwrap();
        assert_eq!(stock.symbol, "KBANK");
        assert!(source.find_stock("SCB").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn search_matches_symbol_or_name_ignoring_case() {
        let source = MockStockDataSource::default().without_latency();
        let symbols = |stocks: Vec<StockSnapshot>| -> Vec<String> {
            stocks.into_iter().map(|s| s.symbol).collect()
        };

        let all = source.search_stocks("  ").await.unwrap();
        assert_eq!(all.len(), 6);

        assert_eq!(symbols(source.search_stocks("adv").await.unwrap()), ["ADVANC"]);
        assert_eq!(symbols(source.search_stocks("AIRPORTS").await.unwrap()), ["AOT"]);
        assert_eq!(
            symbols(source.search_stocks("public").await.unwrap()),
            ["PTT", "CPALL"]
        );
        assert!(source.search_stocks("scb").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn history_for_unknown_symbol_walks_around_100() {
        let source = MockStockDataSource::default().without_latency().with_seed(1);
        let points = source.get_history("UNKNOWN").await.unwrap();
        assert_eq!(points.len(), 91);
        assert!(points[0].price > 70.0 && points[0].price < 100.0);
    }
}
