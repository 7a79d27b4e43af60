use crate::domain::analysis::Recommendation;
use crate::domain::stock::StockSnapshot;
use crate::llm::AnalysisRequest;

pub const REQUIRED_FIELDS: [&str; 4] = [
    "recommendation",
    "confidenceScore",
    "reasoning",
    "riskAssessment",
];

const SYSTEM_INSTRUCTION: &str = "ตอบกลับเป็นภาษาไทย ในฐานะนักวิเคราะห์การเงินมืออาชีพ ให้ข้อมูลที่ตรงไปตรงมาและระมัดระวังความเสี่ยง";

/// Turns a snapshot into the prompt, response schema and system instruction for one analysis.
#[derive(Debug, Clone, Copy, Default)]
pub struct AnalysisRequestBuilder;

impl AnalysisRequestBuilder {
    pub fn build(stock: &StockSnapshot) -> AnalysisRequest {
        AnalysisRequest {
            prompt: Self::prompt(stock),
            schema: Self::schema(),
            system_instruction: SYSTEM_INSTRUCTION.to_string(),
        }
    }

    fn prompt(stock: &StockSnapshot) -> String {
        // Values are embedded exactly as they come, zeros included.
        [
            "คุณคือผู้เชี่ยวชาญด้านการวิเคราะห์การลงทุนในตลาดหลักทรัพย์แห่งประเทศไทย (SET)".to_string(),
            format!("โปรดวิเคราะห์หุ้น: {} ({})", stock.symbol, stock.name),
            String::new(),
            "ข้อมูลปัจจุบัน:".to_string(),
            format!("- ราคา: {} บาท", stock.price),
            format!("- P/E Ratio: {}", stock.pe),
            format!("- P/BV: {}", stock.pbv),
            format!("- Dividend Yield: {}%", stock.dividend_yield),
            format!("- RSI: {} (Indicator ทางเทคนิค)", stock.rsi),
            format!("- ข่าวล่าสุด: \"{}\"", stock.latest_news),
            format!("- รายละเอียดธุรกิจ: \"{}\"", stock.description),
            String::new(),
            "วิเคราะห์ปัจจัยพื้นฐานและเทคนิค แล้วให้คำแนะนำ BUY, SELL หรือ HOLD อย่างใดอย่างหนึ่งเท่านั้น"
                .to_string(),
        ]
        .join("\n")
    }

    fn schema() -> serde_json::Value {
        let recommendations: Vec<&str> = Recommendation::ALL.iter().map(|r| r.as_str()).collect();

        serde_json::json!({
            "type": "OBJECT",
            "properties": {
                "recommendation": {
                    "type": "STRING",
                    "enum": recommendations,
                    "description": "คำแนะนำการลงทุน"
                },
                "confidenceScore": {
                    "type": "NUMBER",
                    "description": "ความมั่นใจในคำแนะนำ (0-100)"
                },
                "reasoning": {
                    "type": "ARRAY",
                    "items": {"type": "STRING"},
                    "description": "เหตุผลประกอบการวิเคราะห์ (สั้นๆ กระชับ 3-4 ข้อ)"
                },
                "riskAssessment": {
                    "type": "STRING",
                    "description": "การประเมินความเสี่ยง"
                },
                "targetPrice": {
                    "type": "NUMBER",
                    "description": "ราคาเป้าหมายที่เหมาะสม (ประเมินคร่าวๆ)"
                }
            },
            "required": REQUIRED_FIELDS,
        })
    }
}
