//! 파이프라인 trait — 모듈 확장 포인트 정의

use crate::types::{Identifier, Role};

/// 세션 역할 판정 전략
///
/// 새로운 역할 판정 방식을 추가하려면 이 trait을 구현합니다.
/// 추적기는 세션 생성 시와 권한 토큰 수신 시마다 `resolve`를 호출합니다.
pub trait RoleResolver: Send {
    /// 전략 이름
    fn name(&self) -> &str;

    /// 식별자와 누적 권한 토큰으로 역할을 판정합니다.
    ///
    /// 같은 입력에는 항상 같은 역할을 반환해야 합니다.
    fn resolve(&self, identifier: &Identifier, permissions: &[String]) -> Role;

    /// 외부 상태(예: 관리자 목록 파일)를 다시 읽어야 하는지 확인하고 반영합니다.
    ///
    /// 상태가 바뀌었으면 `true`를 반환합니다. 기본 구현은 아무것도 하지 않습니다.
    fn reload_if_changed(&mut self) -> bool {
        false
    }
}
