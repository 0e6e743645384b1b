use leptos::prelude::*;
use leptos::task::spawn_local;
use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ApiResult;
use crate::use_app;
use crate::web::route::View;

/// 视图对应的数据请求；没有数据源的视图返回 `Null`
async fn load(api: &ApiClient, target: &View) -> ApiResult<Value> {
    match target {
        View::Dashboard => api.get_dashboard_stats().await,
        View::ProductList => api.get_products(&[]).await,
        View::ProductDetail(id) | View::ProductForm(Some(id)) => api.get_product(id).await,
        View::OrderList => api.get_orders(&[]).await,
        View::OrderDetail(id) => api.get_order(id).await,
        View::CustomerList => api.get_customers(&[]).await,
        View::CustomerDetail(id) => api.get_customer(id).await,
        View::ProductForm(None)
        | View::CustomerForm
        | View::Settings
        | View::Login
        | View::Register => Ok(Value::Null),
    }
}

fn title(target: &View) -> &'static str {
    match target {
        View::Dashboard => "Dashboard",
        View::ProductList => "Produtos",
        View::ProductForm(None) => "Novo produto",
        View::ProductForm(Some(_)) => "Editar produto",
        View::ProductDetail(_) => "Produto",
        View::OrderList => "Pedidos",
        View::OrderDetail(_) => "Pedido",
        View::CustomerList => "Clientes",
        View::CustomerForm => "Novo cliente",
        View::CustomerDetail(_) => "Cliente",
        View::Settings => "Configurações",
        View::Login | View::Register => "",
    }
}

/// 通用资源页：加载数据并原样展示
#[component]
pub fn ResourcePage(target: View) -> impl IntoView {
    let app = use_app();
    let (content, set_content) = signal(Option::<Result<String, String>>::None);

    let services = app.get().services().clone();
    let ticket = services.router.ticket();
    let heading = title(&target);
    spawn_local(async move {
        let result = load(&services.api, &target).await;
        // 期间发生了新的导航，丢弃结果
        if !ticket.is_current() {
            return;
        }
        let rendered = result
            .map(|v| serde_json::to_string_pretty(&v).unwrap_or_default())
            .map_err(|e| e.message().to_string());
        set_content.set(Some(rendered));
    });

    view! {
        <h1 class="text-2xl font-bold mb-4">{heading}</h1>
        {move || match content.get() {
            None => view! { <span class="loading loading-spinner text-primary"></span> }.into_any(),
            Some(Ok(body)) => view! {
                <pre class="bg-base-200 rounded-box p-4 overflow-x-auto text-sm">{body}</pre>
            }
            .into_any(),
            Some(Err(message)) => view! {
                <div role="alert" class="alert alert-error">
                    <span>{message}</span>
                </div>
            }
            .into_any(),
        }}
    }
}
