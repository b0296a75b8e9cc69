//! デプロイ計画
//!
//! `depends_on` から依存グラフを組み立て、トポロジカルソートで起動順を決定します。
//! 依存関係のないサービス同士は宣言順で並べるため、同じ定義からは常に同じ順序になります。

use crate::error::{Result, StackError};
use crate::model::{ServiceSpec, StackDefinition};
use std::collections::{BTreeSet, HashMap, HashSet};
use tracing::debug;

/// 起動順が確定したデプロイ計画
#[derive(Debug, Clone)]
pub struct DeploymentPlan {
    stack: StackDefinition,
    /// `stack.services` のインデックス（起動順）
    order: Vec<usize>,
    /// 各サービスの依存深さ（`stack.services` のインデックス順）
    depth: Vec<usize>,
}

impl DeploymentPlan {
    /// スタック定義から計画を構築
    ///
    /// - 存在しないサービスへの依存 → `UnknownDependency`
    /// - 循環依存 → `CircularDependency`
    /// - サービスが一つもない → `InvalidPlan`
    pub fn build(stack: StackDefinition) -> Result<Self> {
        if stack.services.is_empty() {
            return Err(StackError::InvalidPlan(format!(
                "スタック '{}' にサービスが定義されていません",
                stack.name
            )));
        }

        let index: HashMap<&str, usize> = stack
            .services
            .iter()
            .enumerate()
            .map(|(i, s)| (s.name.as_str(), i))
            .collect();
        if index.len() != stack.services.len() {
            let mut seen = HashSet::new();
            for service in &stack.services {
                if !seen.insert(service.name.as_str()) {
                    return Err(StackError::DuplicateService(service.name.clone()));
                }
            }
        }

        // 依存先インデックス（重複は除去）
        let mut dependencies: Vec<Vec<usize>> = Vec::with_capacity(stack.services.len());
        for service in &stack.services {
            let mut deps = Vec::new();
            for dep in &service.depends_on {
                let dep_index =
                    *index
                        .get(dep.as_str())
                        .ok_or_else(|| StackError::UnknownDependency {
                            service: service.name.clone(),
                            dependency: dep.clone(),
                        })?;
                if !deps.contains(&dep_index) {
                    deps.push(dep_index);
                }
            }
            dependencies.push(deps);
        }

        let (order, depth) = topological_sort(&dependencies).map_err(|remaining| {
            StackError::CircularDependency(find_cycle(&stack.services, &dependencies, &remaining))
        })?;

        debug!(
            stack = %stack.name,
            order = ?order.iter().map(|&i| stack.services[i].name.as_str()).collect::<Vec<_>>(),
            "Built deployment plan"
        );

        Ok(Self {
            stack,
            order,
            depth,
        })
    }

    /// 元のスタック定義
    pub fn stack(&self) -> &StackDefinition {
        &self.stack
    }

    /// 起動順のサービス
    pub fn services(&self) -> impl Iterator<Item = &ServiceSpec> {
        self.order.iter().map(|&i| &self.stack.services[i])
    }

    /// 起動順のサービス名
    pub fn order(&self) -> Vec<&str> {
        self.services().map(|s| s.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&ServiceSpec> {
        self.stack.service(name)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// 依存深さごとのグループ
    ///
    /// 同じウェーブ内のサービスは互いに依存していません。
    pub fn waves(&self) -> Vec<Vec<&str>> {
        let mut waves: Vec<Vec<&str>> = Vec::new();
        for &i in &self.order {
            let level = self.depth[i];
            if waves.len() <= level {
                waves.resize_with(level + 1, Vec::new);
            }
            waves[level].push(self.stack.services[i].name.as_str());
        }
        waves
    }

    /// 計画が使用するネットワーク（スタックのネットワークが先頭）
    pub fn networks(&self) -> Vec<&str> {
        let mut networks = vec![self.stack.network.as_str()];
        for service in self.services() {
            let network = self.stack.network_for(service);
            if !networks.contains(&network) {
                networks.push(network);
            }
        }
        networks
    }
}

/// Kahn法によるトポロジカルソート
///
/// 準備完了のノードが複数ある場合は最小インデックス（宣言順）を優先します。
/// 循環がある場合は未処理のノードを返します。
fn topological_sort(
    dependencies: &[Vec<usize>],
) -> std::result::Result<(Vec<usize>, Vec<usize>), Vec<usize>> {
    let n = dependencies.len();
    let mut in_degree: Vec<usize> = dependencies.iter().map(|d| d.len()).collect();
    let mut dependents: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, deps) in dependencies.iter().enumerate() {
        for &d in deps {
            dependents[d].push(i);
        }
    }

    let mut ready: BTreeSet<usize> = (0..n).filter(|&i| in_degree[i] == 0).collect();
    let mut order = Vec::with_capacity(n);
    let mut depth = vec![0usize; n];

    while let Some(current) = ready.pop_first() {
        order.push(current);
        for &next in &dependents[current] {
            depth[next] = depth[next].max(depth[current] + 1);
            in_degree[next] -= 1;
            if in_degree[next] == 0 {
                ready.insert(next);
            }
        }
    }

    if order.len() == n {
        Ok((order, depth))
    } else {
        Err((0..n).filter(|&i| in_degree[i] > 0).collect())
    }
}

/// 未処理ノードから循環経路を一つ取り出す
///
/// 未処理のノードは必ず未処理の依存先を持つので、依存を辿れば循環に入ります。
fn find_cycle(
    services: &[ServiceSpec],
    dependencies: &[Vec<usize>],
    remaining: &[usize],
) -> Vec<String> {
    let Some(&start) = remaining.first() else {
        return Vec::new();
    };

    let mut path: Vec<usize> = Vec::new();
    let mut current = start;
    loop {
        if let Some(pos) = path.iter().position(|&p| p == current) {
            let mut cycle: Vec<String> = path[pos..]
                .iter()
                .map(|&i| services[i].name.clone())
                .collect();
            cycle.push(services[current].name.clone());
            return cycle;
        }
        path.push(current);
        match dependencies[current]
            .iter()
            .find(|d| remaining.contains(d))
        {
            Some(&next) => current = next,
            None => return path.iter().map(|&i| services[i].name.clone()).collect(),
        }
    }
}
