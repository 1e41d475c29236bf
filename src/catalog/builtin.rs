//! Built-in service catalog

use super::{CatalogSource, NodeSource};

/// (category, [(item label, canonical question)])
const CATEGORIES: &[(&str, &[(&str, &str)])] = &[
    (
        "가맹업무",
        &[
            ("신규가맹신청", "신규 가맹 신청 절차를 알려주세요."),
            ("가맹기간연장", "가맹 기간 연장 절차를 알려주세요."),
            ("한도상향신청", "가맹점 한도 상향 신청 방법을 알려주세요."),
        ],
    ),
    (
        "디지털상품권",
        &[
            ("디지털온누리회원", "디지털 온누리 회원 가입 방법을 알려주세요."),
            ("디지털상품권결제", "디지털 온누리 상품권 결제 방법을 알려주세요."),
        ],
    ),
    (
        "지류상품권",
        &[
            ("상품권발행", "지류 상품권 발행 절차를 알려주세요."),
            ("상품권판매", "지류 상품권 판매 절차를 알려주세요."),
            ("상품권환전", "지류 상품권 환전 절차를 알려주세요."),
        ],
    ),
    (
        "부정유통관리",
        &[
            ("부정유통신고", "부정 유통 신고 방법을 알려주세요."),
            ("부정유통조사", "부정 유통 조사 절차를 알려주세요."),
            ("부정유통청문", "부정 유통 청문 절차를 알려주세요."),
        ],
    ),
    (
        "통합관리시스템",
        &[
            ("로그인(OTP)", "통합관리시스템 OTP 로그인 방법을 알려주세요."),
            ("계정신청", "통합관리시스템 계정 신청 방법을 알려주세요."),
            ("사용권한", "통합관리시스템 사용 권한 설정 방법을 알려주세요."),
        ],
    ),
];

pub(super) fn source() -> CatalogSource {
    CatalogSource {
        categories: CATEGORIES
            .iter()
            .map(|(label, items)| NodeSource {
                label: (*label).to_string(),
                display_text: Some(format!("{label} 관련 안내를 진행하겠습니다.")),
                question: None,
                items: items
                    .iter()
                    .map(|(item, question)| NodeSource {
                        label: (*item).to_string(),
                        display_text: None,
                        question: Some((*question).to_string()),
                        items: vec![],
                    })
                    .collect(),
            })
            .collect(),
    }
}
